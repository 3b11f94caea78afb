//! Plain-text rendering of claims and session snapshots.

use std::fmt::Write;

use fra_atlas_core::{AtlasView, ClaimRecord, StatusCounts};

/// One-line summary used by `list`, `search` and the session dropdown.
pub fn claim_line(record: &ClaimRecord) -> String {
    format!(
        "{:>5}  {:<16} {:<24} {}, {}  [{}]",
        record.id,
        record.claim_id,
        record.patta_holder_name,
        record.village_name,
        record.district,
        record.claim_status().label(),
    )
}

pub fn status_counts(counts: &StatusCounts) -> String {
    let mut out = String::new();
    for (label, n) in [
        ("Verified", counts.verified),
        ("Pending", counts.pending),
        ("Approved", counts.approved),
        ("Rejected", counts.rejected),
        ("Other", counts.other),
    ] {
        let _ = writeln!(out, "  {label:<10} {n}");
    }
    let _ = writeln!(out, "  {:<10} {}", "Total", counts.total());
    out
}

fn detail(out: &mut String, label: &str, value: &str) {
    if !value.is_empty() {
        let _ = writeln!(out, "    {label:<12} {value}");
    }
}

/// Multi-line snapshot for the interactive session.
pub fn view(view: &AtlasView) -> String {
    let mut out = String::new();
    let q = &view.query;
    let _ = writeln!(
        out,
        "query: {:?}  status: {:?}  state: {:?}  district: {:?}",
        q.query, q.status_filter, q.state_filter, q.district_filter
    );

    if view.loading {
        let _ = writeln!(out, "  searching...");
    }
    if view.dropdown_visible {
        if view.dropdown.is_empty() && !view.loading {
            let _ = writeln!(out, "  no matching claims");
        }
        for record in &view.dropdown {
            let _ = writeln!(out, "  [view {}] {}", record.id, claim_line(record).trim_start());
        }
    }

    let _ = writeln!(
        out,
        "map: {} of {} claims ({} placed)",
        view.display.len(),
        view.full_set_len,
        view.markers.len()
    );

    if let Some(ref selected) = view.selected {
        let _ = writeln!(out, "  selected: {} ({})", selected.patta_holder_name, selected.claim_id);
        detail(&mut out, "village", &selected.village_name);
        detail(&mut out, "district", &selected.district);
        detail(&mut out, "state", &selected.state);
        detail(&mut out, "area", &selected.total_area_claimed);
        detail(&mut out, "land use", selected.land_use.as_deref().unwrap_or_default());
        detail(&mut out, "cultivation", selected.cultivation.as_deref().unwrap_or_default());
        detail(&mut out, "phone", selected.phone.as_deref().unwrap_or_default());
        detail(&mut out, "status", selected.claim_status().label());
    }
    out
}
