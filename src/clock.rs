use anyhow::Context;
use time::{Date, OffsetDateTime, UtcOffset};

/// Source of the current date used to pick today's menu.
pub trait Clock: Send + Sync {
    fn today(&self) -> Date;
}

pub struct SystemClock {
    offset: UtcOffset,
}

impl SystemClock {
    pub fn new(utc_offset_hours: i8) -> anyhow::Result<Self> {
        let offset = UtcOffset::from_hms(utc_offset_hours, 0, 0)
            .with_context(|| format!("invalid utc offset {utc_offset_hours}h"))?;
        Ok(Self { offset })
    }
}

impl Clock for SystemClock {
    fn today(&self) -> Date {
        OffsetDateTime::now_utc().to_offset(self.offset).date()
    }
}

/// Clock stuck on one date.
#[cfg(test)]
pub struct FixedClock(pub Date);

#[cfg(test)]
impl Clock for FixedClock {
    fn today(&self) -> Date {
        self.0
    }
}
