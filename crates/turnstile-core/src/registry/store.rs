//! Store - 登録簿のテキストファイル保存
//!
//! 1 行 1 レコードのセミコロン区切り。
//! ```text
//! client;<id>;<name>;<kind>;<YYYY-MM-DD>
//! visit;<id>;<YYYY-MM-DD>;<notes>
//! ```
//! 空行と `#` で始まる行は読み飛ばす。行末の空白はフィールドの一部として残す。
//! 書き込みは全体の上書きで、
//! 耐久性（fsync など）は保証しない。

use chrono::NaiveDate;
use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use super::Registry;
use crate::domain::{Client, ClientId, Subscription, SubscriptionKind, Visit};
use crate::ports::Clock;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("client {id}: {field} must not contain ';' or line breaks")]
    InvalidField { id: ClientId, field: &'static str },
}

fn check_field(id: ClientId, field: &'static str, value: &str) -> Result<(), StoreError> {
    if value.contains([';', '\n', '\r']) {
        return Err(StoreError::InvalidField { id, field });
    }
    Ok(())
}

/// 登録簿をテキストに変換する
pub fn render(registry: &Registry) -> Result<String, StoreError> {
    let mut out = String::new();
    for client in registry.iter() {
        let id = client.id();
        check_field(id, "name", client.name())?;
        let sub = client.subscription();
        // String への write! は失敗しない
        let _ = writeln!(
            out,
            "client;{};{};{};{}",
            id.get(),
            client.name(),
            sub.kind.label(),
            sub.expires_on.format(DATE_FORMAT)
        );
        for visit in client.visits() {
            check_field(id, "visit notes", &visit.notes)?;
            let _ = writeln!(
                out,
                "visit;{};{};{}",
                id.get(),
                visit.date.format(DATE_FORMAT),
                visit.notes
            );
        }
    }
    Ok(out)
}

/// テキストから登録簿を復元する
///
/// ステータスは `clock` の現在時刻で計算し直す。
pub fn parse(text: &str, clock: &dyn Clock) -> Result<Registry, StoreError> {
    let now = clock.now();
    let mut registry = Registry::new();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let err = |reason: String| StoreError::Parse { line, reason };

        let record = raw.trim_start();
        if record.trim_end().is_empty() || record.starts_with('#') {
            continue;
        }
        let record = record.strip_suffix('\r').unwrap_or(record);

        let (tag, rest) = record
            .split_once(';')
            .ok_or_else(|| err("missing record tag".to_string()))?;
        match tag {
            "client" => {
                let fields: Vec<&str> = rest.split(';').collect();
                let &[id, name, kind, expires] = fields.as_slice() else {
                    return Err(err(format!(
                        "client record needs 4 fields, found {}",
                        fields.len()
                    )));
                };
                let id = parse_id(id).map_err(err)?;
                let kind = kind
                    .parse::<SubscriptionKind>()
                    .map_err(|e| err(e.to_string()))?;
                let expires_on = parse_date(expires).map_err(err)?;
                let client = Client::new(id, name, Subscription::new(kind, expires_on), now);
                registry.add(client).map_err(|e| err(e.to_string()))?;
            }
            "visit" => {
                let mut fields = rest.splitn(3, ';');
                let (Some(id), Some(date), notes) = (fields.next(), fields.next(), fields.next())
                else {
                    return Err(err("visit record needs an id and a date".to_string()));
                };
                let id = parse_id(id).map_err(err)?;
                let date = parse_date(date).map_err(err)?;
                registry
                    .record_visit(id, Visit::new(date, notes.unwrap_or_default()))
                    .map_err(|e| err(e.to_string()))?;
            }
            other => return Err(err(format!("unknown record tag '{other}'"))),
        }
    }
    Ok(registry)
}

fn parse_id(value: &str) -> Result<ClientId, String> {
    value
        .parse::<ClientId>()
        .map_err(|e| format!("invalid client id '{value}': {e}"))
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|e| format!("invalid date '{value}': {e}"))
}

/// 登録簿をファイルに保存する（上書き）
pub fn save(path: impl AsRef<Path>, registry: &Registry) -> Result<(), StoreError> {
    let path = path.as_ref();
    let text = render(registry)?;
    std::fs::write(path, text).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), clients = registry.len(), "registry saved");
    Ok(())
}

/// ファイルから登録簿を読み込む（ファイルがなければ空の登録簿）
pub fn load(path: impl AsRef<Path>, clock: &dyn Clock) -> Result<Registry, StoreError> {
    let path = path.as_ref();
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no registry file yet; starting empty");
            return Ok(Registry::new());
        }
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    parse(&text, clock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::FixedClock;
    use chrono::{TimeZone, Utc};

    fn clock() -> FixedClock {
        FixedClock::new(Utc.with_ymd_and_hms(2025, 11, 1, 12, 0, 0).unwrap())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Registry {
        let now = clock().now();
        let mut reg = Registry::new();
        reg.add(Client::new(
            ClientId::new(1),
            "Anna",
            Subscription::new(SubscriptionKind::Premium, date(2025, 11, 12)),
            now,
        ))
        .unwrap();
        reg.add(Client::new(
            ClientId::new(2),
            "Bohdan",
            Subscription::new(SubscriptionKind::Student, date(2025, 1, 31)),
            now,
        ))
        .unwrap();
        reg.record_visit(ClientId::new(1), Visit::new(date(2025, 11, 1), "yoga hall"))
            .unwrap();
        reg.record_visit(ClientId::new(1), Visit::new(date(2025, 11, 5), ""))
            .unwrap();
        reg
    }

    #[test]
    fn renders_one_record_per_line() {
        let text = render(&sample()).unwrap();
        assert_eq!(
            text,
            "client;1;Anna;Premium;2025-11-12\n\
             visit;1;2025-11-01;yoga hall\n\
             visit;1;2025-11-05;\n\
             client;2;Bohdan;Student;2025-01-31\n"
        );
    }

    #[test]
    fn save_then_load_keeps_clients_and_visits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clients.txt");
        let original = sample();

        save(&path, &original).unwrap();
        let loaded = load(&path, &clock()).unwrap();

        let anna = loaded.get(ClientId::new(1)).unwrap();
        assert_eq!(anna, original.get(ClientId::new(1)).unwrap());
        assert_eq!(anna.visits().len(), 2);
        assert!(!loaded.get(ClientId::new(2)).unwrap().is_active());
    }

    #[test]
    fn padded_notes_survive_save_and_load() {
        let mut reg = sample();
        reg.record_visit(ClientId::new(2), Visit::new(date(2025, 1, 10), "  yoga  "))
            .unwrap();

        let text = render(&reg).unwrap();
        let loaded = parse(&text, &clock()).unwrap();

        assert_eq!(loaded.get(ClientId::new(2)).unwrap().visits()[0].notes, "  yoga  ");
        assert_eq!(render(&loaded).unwrap(), text);
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let text = "client;4;Iryna;standard;2026-02-01\r\nvisit;4;2025-11-01;gym\r\n";
        let reg = parse(text, &clock()).unwrap();
        assert_eq!(reg.get(ClientId::new(4)).unwrap().visits()[0].notes, "gym");
    }

    #[test]
    fn missing_file_is_an_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        let reg = load(dir.path().join("nope.txt"), &clock()).unwrap();
        assert!(reg.is_empty());
    }

    #[test]
    fn skips_blank_lines_and_comments() {
        let text = "# clients\n\nclient;4;Iryna;standard;2026-02-01\n";
        let reg = parse(text, &clock()).unwrap();
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get(ClientId::new(4)).unwrap().name(), "Iryna");
    }

    #[test]
    fn reports_line_of_malformed_record() {
        let text = "client;1;Anna;Premium;2025-11-12\nclient;2;Bohdan;Gold;2025-01-31\n";
        let err = parse(text, &clock()).unwrap_err();
        assert!(matches!(err, StoreError::Parse { line: 2, .. }), "{err}");
    }

    #[test]
    fn visit_for_unknown_client_is_rejected() {
        let err = parse("visit;9;2025-11-01;gym\n", &clock()).unwrap_err();
        assert!(matches!(err, StoreError::Parse { line: 1, .. }));
        assert!(err.to_string().contains("#9"));
    }

    #[test]
    fn separator_in_name_is_rejected_on_save() {
        let mut reg = Registry::new();
        reg.add(Client::new(
            ClientId::new(1),
            "Anna;Maria",
            Subscription::new(SubscriptionKind::Standard, date(2026, 1, 1)),
            clock().now(),
        ))
        .unwrap();
        let err = render(&reg).unwrap_err();
        assert!(matches!(err, StoreError::InvalidField { field: "name", .. }));
    }
}
