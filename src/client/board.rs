//! Plain-text rendering of a departure board snapshot.

use crate::client::controller::{FALLBACK_NOTICE, Snapshot};
use crate::models::Departure;
use crate::routes;
use crate::services::time::{format_local_time, format_minutes_label};

fn status_label(realtime: bool) -> &'static str {
    if realtime { "Live" } else { "Planlagt" }
}

fn departure_line(departure: &Departure) -> String {
    format!(
        "{:>5}  {:<8} {:<9} Til {} (kai: {})",
        departure.display_time,
        format_minutes_label(departure.minutes_until),
        status_label(departure.realtime),
        departure.destination,
        departure.quay
    )
}

/// Render the heading, status line, notices and departure list
pub fn render(snapshot: &Snapshot) -> String {
    let heading = routes::direction(snapshot.route, snapshot.direction)
        .map(|d| format!("{} → {}", d.from_label, d.to_label))
        .unwrap_or_else(|| snapshot.direction.to_string());

    let status = match snapshot.data.as_ref() {
        Some(data) => format!("Oppdatert {}", format_local_time(&data.updated_at)),
        None => "Venter på første oppdatering".to_string(),
    };

    let mut lines = vec![heading, status];

    if snapshot.is_fallback {
        lines.push(format!("! {}", FALLBACK_NOTICE));
    } else if let Some(error) = snapshot.error.as_ref() {
        lines.push(format!("! {}", error));
    }

    let departures = snapshot
        .data
        .as_ref()
        .map(|d| d.departures.as_slice())
        .unwrap_or_default();

    match departures.split_first() {
        Some((next, later)) => {
            lines.push("Neste avgang:".to_string());
            lines.push(format!("  {}", departure_line(next)));
            if later.is_empty() {
                lines.push("Ingen flere avganger akkurat nå.".to_string());
            }
            lines.extend(later.iter().map(|d| format!("  {}", departure_line(d))));
        }
        None if snapshot.is_loading => lines.push("Henter neste avganger...".to_string()),
        None => lines.push("Ingen avganger funnet akkurat nå.".to_string()),
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
