pub mod lockout;

pub use lockout::SqliteLockoutRepository;
