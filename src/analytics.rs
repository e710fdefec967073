//! Chart-ready series derived from the lead list and a stats snapshot.
//!
//! Everything here is pure: callers pass the leads, the latest stats (if
//! any) and the reference instant, and get back the full dashboard payload.

use crate::models::{Classification, Lead, LeadStats, LeadStatus};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Number of trailing calendar months in `evolution_data`, current included.
pub const EVOLUTION_MONTHS: u32 = 6;
/// Maximum number of origins returned by `origin_data`.
pub const TOP_ORIGINS: usize = 10;

pub const ORIGIN_PALETTE: [&str; 6] = [
    "#3B82F6", "#10B981", "#F59E0B", "#EF4444", "#8B5CF6", "#EC4899",
];

const MONTH_LABELS_PT_BR: [&str; 12] = [
    "jan.", "fev.", "mar.", "abr.", "mai.", "jun.", "jul.", "ago.", "set.", "out.", "nov.", "dez.",
];

fn status_color(status: LeadStatus) -> &'static str {
    match status {
        LeadStatus::EmAtendimento => "#3B82F6",
        LeadStatus::Finalizado => "#10B981",
        LeadStatus::Travado => "#EF4444",
    }
}

fn classification_color(classification: Classification) -> &'static str {
    match classification {
        Classification::Quente => "#10B981",
        Classification::Morno => "#F59E0B",
        Classification::Frio => "#EF4444",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSlice {
    pub name: String,
    pub value: i64,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvolutionPoint {
    pub month: &'static str,
    pub leads: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusScore {
    pub status: &'static str,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadAnalytics {
    pub status_data: Vec<ChartSlice>,
    pub classification_data: Vec<ChartSlice>,
    pub origin_data: Vec<ChartSlice>,
    pub evolution_data: Vec<EvolutionPoint>,
    pub average_score_by_status: Vec<StatusScore>,
    pub conversion_rate: i64,
}

impl LeadAnalytics {
    pub fn derive(leads: &[Lead], stats: Option<&LeadStats>, now: DateTime<Utc>) -> Self {
        Self {
            status_data: status_data(leads),
            classification_data: classification_data(stats),
            origin_data: origin_data(leads),
            evolution_data: evolution_data(leads, now),
            average_score_by_status: average_score_by_status(leads),
            conversion_rate: conversion_rate(leads, stats),
        }
    }
}

pub fn status_data(leads: &[Lead]) -> Vec<ChartSlice> {
    LeadStatus::ALL
        .iter()
        .map(|&status| ChartSlice {
            name: status.label().to_string(),
            value: leads.iter().filter(|l| l.status == status).count() as i64,
            color: status_color(status),
        })
        .collect()
}

/// Taken from the stats snapshot, not recounted from the leads.
pub fn classification_data(stats: Option<&LeadStats>) -> Vec<ChartSlice> {
    let count = |c: Classification| match (stats, c) {
        (None, _) => 0,
        (Some(s), Classification::Quente) => s.quente,
        (Some(s), Classification::Morno) => s.morno,
        (Some(s), Classification::Frio) => s.frio,
    };

    [
        Classification::Quente,
        Classification::Morno,
        Classification::Frio,
    ]
    .into_iter()
    .map(|c| ChartSlice {
        name: c.as_str().to_string(),
        value: count(c),
        color: classification_color(c),
    })
    .collect()
}

/// Top origins by lead count. Ties keep first-seen order; colors follow rank.
pub fn origin_data(leads: &[Lead]) -> Vec<ChartSlice> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(&str, i64)> = Vec::new();

    for lead in leads {
        match index.get(lead.origin.as_str()) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(lead.origin.as_str(), counts.len());
                counts.push((lead.origin.as_str(), 1));
            }
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(TOP_ORIGINS)
        .enumerate()
        .map(|(rank, (name, value))| ChartSlice {
            name: name.to_string(),
            value,
            color: ORIGIN_PALETTE[rank % ORIGIN_PALETTE.len()],
        })
        .collect()
}

/// Leads created in each of the trailing months, oldest first.
pub fn evolution_data(leads: &[Lead], now: DateTime<Utc>) -> Vec<EvolutionPoint> {
    (0..EVOLUTION_MONTHS as i32)
        .rev()
        .map(|back| {
            let (year, month) = shift_month(now.year(), now.month(), -back);
            let (next_year, next_month) = shift_month(now.year(), now.month(), 1 - back);
            let start = month_start(year, month);
            let end = month_start(next_year, next_month) - Duration::seconds(1);

            EvolutionPoint {
                month: MONTH_LABELS_PT_BR[(month - 1) as usize],
                leads: leads
                    .iter()
                    .filter(|l| l.created_at >= start && l.created_at <= end)
                    .count() as i64,
            }
        })
        .collect()
}

/// `(year, month)` moved by `offset` months (negative goes back).
fn shift_month(year: i32, month: u32, offset: i32) -> (i32, u32) {
    let index = year * 12 + (month as i32 - 1) + offset;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

fn month_start(year: i32, month: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Mean score of the scored leads in each status, one decimal, 0 when none.
pub fn average_score_by_status(leads: &[Lead]) -> Vec<StatusScore> {
    LeadStatus::ALL
        .iter()
        .map(|&status| {
            let scores: Vec<i32> = leads
                .iter()
                .filter(|l| l.status == status)
                .filter_map(|l| l.score)
                .collect();

            let score = if scores.is_empty() {
                0.0
            } else {
                let mean = scores.iter().map(|&s| s as f64).sum::<f64>() / scores.len() as f64;
                (mean * 10.0).round() / 10.0
            };

            StatusScore {
                status: status.label(),
                score,
            }
        })
        .collect()
}

/// Share of finalized leads over the stats total, as a whole percentage.
pub fn conversion_rate(leads: &[Lead], stats: Option<&LeadStats>) -> i64 {
    let total = match stats {
        Some(s) if s.total > 0 => s.total,
        _ => return 0,
    };
    let finalized = leads
        .iter()
        .filter(|l| l.status == LeadStatus::Finalizado)
        .count();

    (finalized as f64 / total as f64 * 100.0).round() as i64
}

/// Leads grouped into the three board columns, input order preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KanbanBoard {
    pub em_atendimento: Vec<Lead>,
    pub finalizado: Vec<Lead>,
    pub travado: Vec<Lead>,
}

impl KanbanBoard {
    pub fn from_leads(leads: &[Lead]) -> Self {
        let mut board = Self::default();
        for lead in leads {
            board.column_mut(lead.status).push(lead.clone());
        }
        board
    }

    pub fn column(&self, status: LeadStatus) -> &[Lead] {
        match status {
            LeadStatus::EmAtendimento => &self.em_atendimento,
            LeadStatus::Finalizado => &self.finalizado,
            LeadStatus::Travado => &self.travado,
        }
    }

    fn column_mut(&mut self, status: LeadStatus) -> &mut Vec<Lead> {
        match status {
            LeadStatus::EmAtendimento => &mut self.em_atendimento,
            LeadStatus::Finalizado => &mut self.finalizado,
            LeadStatus::Travado => &mut self.travado,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn lead(origin: &str, status: LeadStatus, score: Option<i32>, created: &str) -> Lead {
        let created_at = DateTime::parse_from_rfc3339(created)
            .unwrap()
            .with_timezone(&Utc);
        Lead {
            id: Uuid::new_v4(),
            name: "Lead".into(),
            email: None,
            phone: None,
            message: "Teste".into(),
            origin: origin.into(),
            response_time: None,
            interactions: 0,
            score,
            classification: None,
            score_reason: None,
            status,
            analyzed_at: None,
            created_at,
            updated_at: created_at,
        }
    }

    fn sample() -> Vec<Lead> {
        vec![
            lead("WhatsApp", LeadStatus::EmAtendimento, Some(85), "2024-01-15T00:00:00Z"),
            lead("Formulário", LeadStatus::Finalizado, Some(50), "2024-02-15T00:00:00Z"),
            lead("WhatsApp", LeadStatus::Travado, Some(30), "2024-03-15T00:00:00Z"),
        ]
    }

    fn stats() -> LeadStats {
        LeadStats {
            total: 3,
            quente: 1,
            morno: 1,
            frio: 1,
            average_score: 55,
        }
    }

    fn march_2024() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_status_data() {
        let data = status_data(&sample());
        assert_eq!(
            data,
            vec![
                ChartSlice { name: "Em Atendimento".into(), value: 1, color: "#3B82F6" },
                ChartSlice { name: "Finalizado".into(), value: 1, color: "#10B981" },
                ChartSlice { name: "Travado".into(), value: 1, color: "#EF4444" },
            ]
        );
    }

    #[test]
    fn test_classification_data_from_stats() {
        let data = classification_data(Some(&stats()));
        let values: Vec<i64> = data.iter().map(|s| s.value).collect();
        assert_eq!(values, vec![1, 1, 1]);
        assert_eq!(data[0].name, "Quente");

        let empty = classification_data(None);
        assert!(empty.iter().all(|s| s.value == 0));
        assert_eq!(empty.len(), 3);
    }

    #[test]
    fn test_origin_data_sorted_and_ranked() {
        let data = origin_data(&sample());
        assert_eq!(data.len(), 2);
        assert_eq!(data[0].name, "WhatsApp");
        assert_eq!(data[0].value, 2);
        assert_eq!(data[0].color, ORIGIN_PALETTE[0]);
        assert_eq!(data[1].name, "Formulário");
        assert_eq!(data[1].color, ORIGIN_PALETTE[1]);
    }

    #[test]
    fn test_origin_data_truncates_to_top_ten() {
        let mut leads = Vec::new();
        for i in 0..12 {
            for _ in 0..=i {
                leads.push(lead(&format!("canal-{}", i), LeadStatus::EmAtendimento, None, "2024-01-01T00:00:00Z"));
            }
        }
        let data = origin_data(&leads);
        assert_eq!(data.len(), TOP_ORIGINS);
        assert_eq!(data[0].name, "canal-11");
        assert!(data.windows(2).all(|w| w[0].value >= w[1].value));
        assert_eq!(data[6].color, ORIGIN_PALETTE[0]);
    }

    #[test]
    fn test_evolution_has_six_months() {
        let data = evolution_data(&sample(), march_2024());
        let months: Vec<&str> = data.iter().map(|p| p.month).collect();
        assert_eq!(months, vec!["out.", "nov.", "dez.", "jan.", "fev.", "mar."]);
        let counts: Vec<i64> = data.iter().map(|p| p.leads).collect();
        assert_eq!(counts, vec![0, 0, 0, 1, 1, 1]);

        let empty = evolution_data(&[], march_2024());
        assert_eq!(empty.len(), 6);
        assert!(empty.iter().all(|p| p.leads == 0));
    }

    #[test]
    fn test_evolution_month_bounds_are_inclusive() {
        let leads = vec![
            lead("x", LeadStatus::EmAtendimento, None, "2024-02-01T00:00:00Z"),
            lead("x", LeadStatus::EmAtendimento, None, "2024-02-29T23:59:59Z"),
            lead("x", LeadStatus::EmAtendimento, None, "2024-03-01T00:00:00Z"),
        ];
        let data = evolution_data(&leads, march_2024());
        assert_eq!(data[4].month, "fev.");
        assert_eq!(data[4].leads, 2);
        assert_eq!(data[5].leads, 1);
    }

    #[test]
    fn test_average_score_by_status() {
        let mut leads = sample();
        leads.push(lead("x", LeadStatus::EmAtendimento, Some(70), "2024-01-01T00:00:00Z"));
        leads.push(lead("x", LeadStatus::EmAtendimento, Some(66), "2024-01-01T00:00:00Z"));
        leads.push(lead("x", LeadStatus::Travado, None, "2024-01-01T00:00:00Z"));

        let data = average_score_by_status(&leads);
        assert_eq!(data[0].status, "Em Atendimento");
        assert_eq!(data[0].score, 73.7);
        assert_eq!(data[1].score, 50.0);
        assert_eq!(data[2].score, 30.0);

        let empty = average_score_by_status(&[]);
        assert!(empty.iter().all(|s| s.score == 0.0));
    }

    #[test]
    fn test_conversion_rate() {
        assert_eq!(conversion_rate(&sample(), Some(&stats())), 33);
        assert_eq!(conversion_rate(&sample(), None), 0);
        assert_eq!(conversion_rate(&sample(), Some(&LeadStats::default())), 0);
    }

    #[test]
    fn test_kanban_groups_by_status() {
        let board = KanbanBoard::from_leads(&sample());
        assert_eq!(board.column(LeadStatus::EmAtendimento).len(), 1);
        assert_eq!(board.column(LeadStatus::Finalizado).len(), 1);
        assert_eq!(board.travado[0].score, Some(30));
    }

    #[test]
    fn test_derive_combines_series() {
        let analytics = LeadAnalytics::derive(&sample(), Some(&stats()), march_2024());
        assert_eq!(analytics.evolution_data.len(), 6);
        assert_eq!(analytics.conversion_rate, 33);
        let json = serde_json::to_value(&analytics).unwrap();
        assert!(json.get("averageScoreByStatus").is_some());
    }
}
