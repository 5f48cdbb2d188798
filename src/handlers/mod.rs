pub mod brand;
pub mod category;
pub mod counter;
pub mod product;
pub mod product_description;
pub mod review;
pub mod user;
