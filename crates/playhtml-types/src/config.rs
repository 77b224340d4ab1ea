//! Environment-driven configuration, read once at startup.

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
	/// Connection string / path handed to the persistence adapter.
	pub persist_url: Box<str>,
	/// Credential/passphrase handed to the persistence adapter, if any.
	pub persist_key: Option<Box<str>>,
	/// Shared secret gating the admin control plane. `None` disables admin auth.
	pub admin_token: Option<Box<str>>,
	pub listen_addr: Box<str>,
	pub prune_interval_secs: u64,
	pub subscriber_lease_secs: u64,
}

impl Config {
	pub fn from_env() -> Self {
		Self {
			persist_url: env::var("PERSIST_URL").unwrap_or_else(|_| "./rooms.redb".into()).into(),
			persist_key: env::var("PERSIST_KEY").ok().map(Into::into),
			admin_token: env::var("ADMIN_TOKEN").ok().map(Into::into),
			listen_addr: env::var("LISTEN_ADDR").unwrap_or_else(|_| "127.0.0.1:8787".into()).into(),
			prune_interval_secs: env::var("PRUNE_INTERVAL_SECS")
				.ok()
				.and_then(|v| v.parse().ok())
				.unwrap_or(4 * 60 * 60),
			subscriber_lease_secs: env::var("SUBSCRIBER_LEASE_SECS")
				.ok()
				.and_then(|v| v.parse().ok())
				.unwrap_or(12 * 60 * 60),
		}
	}
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
	use super::*;

	#[test]
	fn defaults_match_spec() {
		// SAFETY: test runs single-threaded w.r.t. these vars within this process.
		for var in ["PERSIST_URL", "PERSIST_KEY", "ADMIN_TOKEN", "LISTEN_ADDR", "PRUNE_INTERVAL_SECS", "SUBSCRIBER_LEASE_SECS"] {
			unsafe { env::remove_var(var) };
		}
		let cfg = Config::from_env();
		assert_eq!(cfg.listen_addr.as_ref(), "127.0.0.1:8787");
		assert_eq!(cfg.prune_interval_secs, 14_400);
		assert_eq!(cfg.subscriber_lease_secs, 43_200);
		assert!(cfg.admin_token.is_none());
	}

	#[test]
	fn overrides_win() {
		unsafe {
			env::set_var("PRUNE_INTERVAL_SECS", "60");
			env::set_var("ADMIN_TOKEN", "s3cret");
		}
		let cfg = Config::from_env();
		assert_eq!(cfg.prune_interval_secs, 60);
		assert_eq!(cfg.admin_token.as_deref(), Some("s3cret"));
		unsafe {
			env::remove_var("PRUNE_INTERVAL_SECS");
			env::remove_var("ADMIN_TOKEN");
		}
	}
}
