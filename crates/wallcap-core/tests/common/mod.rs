pub mod mock_browser;
