pub mod json_model_file;
