use crate::core::config::data::Config;

impl Config {
    pub fn print_all(&self) {
        println!("Current configuration:");
        match &self.base_url {
            Some(url) => println!("  base-url: {url}"),
            None => println!("  base-url: (unset)"),
        }
        match self.heartbeat_interval_secs {
            Some(secs) => println!("  heartbeat-interval: {secs}s"),
            None => println!("  heartbeat-interval: (unset)"),
        }
        match self.session_name_limit {
            Some(limit) => println!("  session-name-limit: {limit}"),
            None => println!("  session-name-limit: (unset)"),
        }
        match &self.log_file {
            Some(path) => println!("  log-file: {path}"),
            None => println!("  log-file: (unset)"),
        }
    }
}
