use env_logger::{Builder, Env};

pub fn init() {
	Builder::from_env(Env::new().filter_or("VULNCORR_LOG", "info"))
		.format_timestamp_millis()
		.format_module_path(true)
		.init();
}
