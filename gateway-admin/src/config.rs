use mini_config::Configure;

/// Static process settings stored through `mini-config`. The real bind
/// address and database path are supplied on the command line (see `main`'s
/// `clap` parsing); these keys exist as a central place other in-process
/// collaborators can read a setting from without threading it through every
/// call site.
#[derive(Debug, Clone, Configure)]
pub enum Api {
    TCPAddress,
    DatabasePath,
}

pub fn init() {
    Api::TCPAddress.set("127.0.0.1:30098");
    Api::DatabasePath.set("./data/gateway-admin.sqlite3");
}
