pub mod mock_constants;
pub mod mock_driver;
