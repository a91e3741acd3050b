pub mod ultragroth;
