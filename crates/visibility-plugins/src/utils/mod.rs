pub mod completion;
pub mod config;
pub mod credentials;
pub mod page;
pub mod page_plugin;
pub mod registry;

#[cfg(test)]
pub mod test_server;
