//! Clock commands - the state file keeps its own notion of "now"

use anyhow::Context;
use chrono::{Duration, Utc};
use pactline_core::Clock;

use crate::display;
use crate::state::Session;

pub fn now(session: &Session) {
    display::labeled("Now", &session.clock().now().to_rfc3339());
}

pub fn advance(session: &Session, hours: i64, days: i64) -> anyhow::Result<()> {
    if hours < 0 || days < 0 {
        anyhow::bail!("the clock only moves forward");
    }
    let by = step(hours, days).context("clock advance is out of range")?;
    session
        .clock()
        .advance(by)
        .context("clock advance would move past the last representable time")?;
    now(session);
    Ok(())
}

fn step(hours: i64, days: i64) -> Option<Duration> {
    Duration::try_days(days)?.checked_add(&Duration::try_hours(hours)?)
}

/// Jump to wall-clock time, never backwards
pub fn sync(session: &Session) {
    let wall = Utc::now();
    if wall > session.clock().now() {
        session.clock().set(wall);
    } else {
        display::warning("state clock is ahead of wall-clock time; left unchanged");
    }
    now(session);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::party;

    fn session(name: &str) -> Session {
        let path = std::env::temp_dir().join(format!("pactline-clock-{}-{}.json", name, std::process::id()));
        Session::init(&path, party("admin").unwrap(), party("custody").unwrap(), true).unwrap()
    }

    #[test]
    fn advance_moves_forward() {
        let session = session("forward");
        let start = session.clock().now();
        advance(&session, 2, 1).unwrap();
        assert_eq!(session.clock().now(), start + Duration::hours(26));
    }

    #[test]
    fn out_of_range_advance_is_an_error() {
        let session = session("range");
        let start = session.clock().now();
        assert!(advance(&session, 0, 200_000_000_000_000).is_err());
        assert!(advance(&session, i64::MAX, 0).is_err());
        assert!(advance(&session, 0, 100_000_000).is_err());
        assert_eq!(session.clock().now(), start);
    }

    #[test]
    fn backwards_advance_is_refused() {
        let session = session("backwards");
        assert!(advance(&session, -1, 0).is_err());
    }
}
