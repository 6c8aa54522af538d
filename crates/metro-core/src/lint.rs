//! Correctness diagnostics for map documents.
//!
//! Reports structural issues without modifying the document. The editor
//! shows these on demand; nothing here blocks editing or export.

use crate::id::Id;
use crate::model::{MapDocument, MapSection, SectionKind};
use crate::network::StationNetwork;
use std::collections::{HashMap, HashSet};

// ─── Diagnostic types ────────────────────────────────────────────────────

/// Severity of a lint finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintSeverity {
    /// Likely a data error.
    Warning,
    /// Worth a look, often intentional.
    Info,
}

/// A single lint diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct LintDiagnostic {
    /// Short rule identifier (e.g. "duplicate-station-id").
    pub rule: &'static str,
    pub severity: LintSeverity,
    /// Human-readable message.
    pub message: String,
    /// Section the finding belongs to.
    pub section: SectionKind,
    /// Offending entity, when it has an id.
    pub subject: Option<Id>,
}

// ─── Public API ──────────────────────────────────────────────────────────

/// Run every rule over every section.
#[must_use]
pub fn lint_document(doc: &MapDocument) -> Vec<LintDiagnostic> {
    let mut diags = Vec::new();
    lint_duplicate_station_ids(doc, &mut diags);
    for (kind, section) in doc.sections() {
        let mut ctx = Ctx {
            kind,
            section,
            diags: &mut diags,
        };
        ctx.missing_ids();
        ctx.transfers();
        ctx.neighbors();
        ctx.isolated_stations();
    }
    diags
}

struct Ctx<'a> {
    kind: SectionKind,
    section: &'a MapSection,
    diags: &'a mut Vec<LintDiagnostic>,
}

impl Ctx<'_> {
    fn push(
        &mut self,
        rule: &'static str,
        severity: LintSeverity,
        subject: Option<Id>,
        message: String,
    ) {
        self.diags.push(LintDiagnostic {
            rule,
            severity,
            message,
            section: self.kind,
            subject,
        });
    }

    fn known(&self, id: Id) -> bool {
        self.section.station(id).is_some()
    }

    // ─── Rules ───────────────────────────────────────────────────────────

    fn missing_ids(&mut self) {
        let section = self.section;
        for (li, line) in section.lines.iter().enumerate() {
            if line.id.is_empty() {
                self.push(
                    "missing-line-id",
                    LintSeverity::Warning,
                    None,
                    format!("Line #{} (`{}`) has no id.", li + 1, line.name),
                );
            }
            for (si, station) in line.stations.iter().enumerate() {
                if station.id.is_empty() {
                    self.push(
                        "missing-station-id",
                        LintSeverity::Warning,
                        Some(line.id),
                        format!(
                            "Station #{} (`{}`) on line `{}` has no id.",
                            si + 1,
                            station.name,
                            line.id
                        ),
                    );
                }
            }
        }
    }

    fn transfers(&mut self) {
        let section = self.section;
        for (ti, t) in section.transfers.iter().enumerate() {
            let subject = (!t.id.is_empty()).then_some(t.id);
            if t.id.is_empty() {
                self.push(
                    "missing-transfer-id",
                    LintSeverity::Warning,
                    None,
                    format!("Transfer #{} has no id.", ti + 1),
                );
            }
            if t.stations.len() < 2 {
                self.push(
                    "transfer-too-small",
                    LintSeverity::Warning,
                    subject,
                    format!(
                        "Transfer `{}` links {} station(s); at least 2 are required.",
                        t.id,
                        t.stations.len()
                    ),
                );
            }
            for sid in &t.stations {
                if !self.known(*sid) {
                    self.push(
                        "transfer-unknown-station",
                        LintSeverity::Warning,
                        subject,
                        format!("Transfer `{}` references unknown station `{sid}`.", t.id),
                    );
                }
            }
            if t.time < 0.0 {
                self.push(
                    "negative-time",
                    LintSeverity::Warning,
                    subject,
                    format!("Transfer `{}` has negative time {}.", t.id, t.time),
                );
            }
        }
    }

    fn neighbors(&mut self) {
        let section = self.section;
        for station in section.stations() {
            for n in station.neighbors() {
                if n.time < 0.0 {
                    self.push(
                        "negative-time",
                        LintSeverity::Warning,
                        Some(station.id),
                        format!(
                            "Link `{}` → `{}` has negative time {}.",
                            station.id, n.id, n.time
                        ),
                    );
                }
                match section.station(n.id) {
                    None => self.push(
                        "unknown-neighbor",
                        LintSeverity::Warning,
                        Some(station.id),
                        format!(
                            "Station `{}` lists unknown neighbor `{}`.",
                            station.id, n.id
                        ),
                    ),
                    Some(other) if !other.has_neighbor(station.id) => self.push(
                        "asymmetric-neighbor",
                        LintSeverity::Info,
                        Some(station.id),
                        format!(
                            "`{}` lists `{}` as neighbor but not the other way round.",
                            station.id, n.id
                        ),
                    ),
                    Some(_) => {}
                }
            }
        }
    }

    fn isolated_stations(&mut self) {
        let section = self.section;
        let net = StationNetwork::build(section);
        for line in section.lines.iter().filter(|l| l.stations.len() > 1) {
            for station in &line.stations {
                if !station.id.is_empty() && net.is_isolated(station.id) {
                    self.push(
                        "isolated-station",
                        LintSeverity::Info,
                        Some(station.id),
                        format!(
                            "Station `{}` on line `{}` has no neighbor or transfer links.",
                            station.id, line.id
                        ),
                    );
                }
            }
        }
    }
}

/// Station ids must be unique across the whole document.
fn lint_duplicate_station_ids(doc: &MapDocument, diags: &mut Vec<LintDiagnostic>) {
    let mut seen: HashMap<Id, SectionKind> = HashMap::new();
    let mut reported = HashSet::new();
    for (kind, section) in doc.sections() {
        for station in section.stations() {
            if station.id.is_empty() {
                continue;
            }
            if seen.insert(station.id, kind).is_some() && reported.insert(station.id) {
                diags.push(LintDiagnostic {
                    rule: "duplicate-station-id",
                    severity: LintSeverity::Warning,
                    message: format!("Station id `{}` is used more than once.", station.id),
                    section: kind,
                    subject: Some(station.id),
                });
            }
        }
    }
}
