pub mod meetings;
pub mod recording;
pub mod review;
