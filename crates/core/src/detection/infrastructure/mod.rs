pub mod histogram_classifier;
pub mod replay_face_locator;
