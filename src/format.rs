use std::sync::Arc;

use arc_swap::ArcSwap;
use time::{OffsetDateTime, UtcOffset};

use crate::config::OPERATION_FORMAT;
use crate::record::Record;

/// Rendered date/time fragments for one whole second.
struct Stamps {
    second: i64,
    short_time: String,
    short_date: String,
    long_time: String,
    long_date: String,
}

/// Per-second cache of rendered date/time fragments.
///
/// Every record within the same whole second shares the same four
/// fragments, so they are computed once and reused. The current snapshot
/// is replaced in a single atomic store: concurrent recomputation for the
/// same second is redundant but harmless, and fragments from two
/// different seconds can never mix.
pub struct FormatCache {
    stamps: ArcSwap<Stamps>,
}

impl FormatCache {
    /// Create an empty cache. The first render always recomputes.
    pub fn new() -> Self {
        Self {
            stamps: ArcSwap::from_pointee(Stamps {
                second: i64::MIN,
                short_time: String::new(),
                short_date: String::new(),
                long_time: String::new(),
                long_date: String::new(),
            }),
        }
    }

    /// Render `record` through `template`, appending a newline.
    ///
    /// Directives: `%T` long time, `%t` short time, `%D` long date, `%d`
    /// short date, `%L` level tag, `%S` source, `%s` source basename,
    /// `%M` message. Unknown directives are swallowed; an empty template
    /// falls back to [`OPERATION_FORMAT`].
    pub fn render(&self, template: &str, record: &Record) -> String {
        let template = if template.is_empty() {
            OPERATION_FORMAT
        } else {
            template
        };
        let stamps = self.stamps_for(record.created);

        let mut out = String::with_capacity(64);
        for (i, piece) in template.split('%').enumerate() {
            if i == 0 {
                out.push_str(piece);
                continue;
            }
            let Some(directive) = piece.chars().next() else {
                continue;
            };
            match directive {
                'T' => out.push_str(&stamps.long_time),
                't' => out.push_str(&stamps.short_time),
                'D' => out.push_str(&stamps.long_date),
                'd' => out.push_str(&stamps.short_date),
                'L' => out.push_str(record.level.tag()),
                'S' => out.push_str(&record.source),
                's' => out.push_str(record.source.rsplit('/').next().unwrap_or("")),
                'M' => out.push_str(&record.message),
                _ => {}
            }
            out.push_str(&piece[directive.len_utf8()..]);
        }
        out.push('\n');
        out
    }

    /// Fragments for the record's whole second: the cached snapshot on a
    /// hit, a freshly computed and atomically swapped-in one on a miss.
    fn stamps_for(&self, created: OffsetDateTime) -> Arc<Stamps> {
        let second = created.unix_timestamp();
        let current = self.stamps.load_full();
        if current.second == second {
            return current;
        }

        let fresh = Arc::new(Stamps {
            second,
            short_time: format!("{:02}:{:02}", created.hour(), created.minute()),
            short_date: format!(
                "{:02}/{:02}/{:02}",
                created.day(),
                u8::from(created.month()),
                created.year().rem_euclid(100)
            ),
            long_time: format!(
                "{:02}:{:02}:{:02} {}",
                created.hour(),
                created.minute(),
                created.second(),
                offset_tag(created.offset())
            ),
            long_date: format!(
                "{:04}/{:02}/{:02}",
                created.year(),
                u8::from(created.month()),
                created.day()
            ),
        });
        self.stamps.store(Arc::clone(&fresh));
        fresh
    }
}

impl Default for FormatCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Numeric offset label for the long time fragment, e.g. `+0800`.
fn offset_tag(offset: UtcOffset) -> String {
    let (hours, minutes, _) = offset.as_hms();
    format!("{:+03}{:02}", hours, minutes.abs())
}
