pub mod tonemap;
