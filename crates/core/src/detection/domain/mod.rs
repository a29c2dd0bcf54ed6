pub mod classifier;
pub mod face_locator;
