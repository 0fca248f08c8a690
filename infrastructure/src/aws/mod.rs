pub mod quicksight;
pub mod s3;
