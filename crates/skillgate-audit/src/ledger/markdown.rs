//! Human-readable ledger view, regenerated in full from the entries.

use std::fmt::Write as _;

use skillgate_core::{short_hash, EntryStatus, LedgerEntry};

/// Render the whole ledger as a Markdown document.
///
/// Pure function of `entries`; the mirror file is always this output, never
/// an incremental append.
pub fn render_markdown(entries: &[LedgerEntry]) -> String {
    let count = |s: EntryStatus| entries.iter().filter(|e| e.status == s).count();

    let mut out = String::from("# Skill Ledger\n\n");
    let _ = writeln!(
        out,
        "{} entries: {} approved, {} blocked, {} revoked\n",
        entries.len(),
        count(EntryStatus::Approved),
        count(EntryStatus::Blocked),
        count(EntryStatus::Revoked),
    );

    if entries.is_empty() {
        out.push_str("_No entries._\n");
        return out;
    }

    out.push_str("| Date | Name | Version | Status | Approver | Score | Risk | Hash | Source | Purpose |\n");
    out.push_str("|------|------|---------|--------|----------|------:|------|------|--------|---------|\n");
    for e in entries {
        let date = e
            .date
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        let status = match e.revoked_at {
            Some(at) => format!("{} ({})", e.status, at.format("%Y-%m-%d")),
            None => e.status.to_string(),
        };
        let hash = short_hash(&e.hash);
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} | {} | `{}` | {} | {} |",
            date,
            cell(&e.name),
            cell(e.version.as_deref().unwrap_or("-")),
            status,
            e.approver,
            e.score,
            e.risk,
            hash,
            cell(e.source.as_deref().unwrap_or("-")),
            cell(e.purpose.as_deref().unwrap_or("")),
        );
    }
    out
}

/// Keep table cells on one line and out of the column syntax.
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use skillgate_core::{Approver, Risk};

    fn entry(name: &str, status: EntryStatus) -> LedgerEntry {
        LedgerEntry {
            name: name.into(),
            version: Some("1.0.0".into()),
            source: None,
            score: 92,
            risk: Risk::Low,
            hash: "0123456789abcdef0123".into(),
            date: Some(Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 0).unwrap()),
            status,
            approver: Approver::Human,
            purpose: Some("weather | forecasts\nfor trips".into()),
            findings_count: Some(0),
            revoked_at: None,
        }
    }

    #[test]
    fn renders_rows_and_summary() {
        let md = render_markdown(&[entry("weather", EntryStatus::Approved), entry("evil", EntryStatus::Blocked)]);
        assert!(md.starts_with("# Skill Ledger\n"));
        assert!(md.contains("2 entries: 1 approved, 1 blocked, 0 revoked"));
        assert!(md.contains("| 2026-03-01 12:30 | weather | 1.0.0 | approved | human | 92 | LOW | `0123456789ab` |"));
        assert!(md.contains("weather \\| forecasts for trips"));
    }

    #[test]
    fn empty_ledger() {
        let md = render_markdown(&[]);
        assert!(md.contains("0 entries"));
        assert!(md.contains("_No entries._"));
    }

    #[test]
    fn hand_edited_multibyte_hash_renders() {
        let mut e = entry("edited", EntryStatus::Approved);
        e.hash = "0123456789aé-not-hex".into();
        let md = render_markdown(&[e]);
        assert!(md.contains("`0123456789aé`"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let entries = vec![entry("a", EntryStatus::Revoked)];
        assert_eq!(render_markdown(&entries), render_markdown(&entries));
    }
}
