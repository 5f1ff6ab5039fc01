//! Dashboard aggregations behind the chart endpoints

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use super::summaries::InstallmentFact;
use super::Database;
use crate::calendar::{month_bounds, year_bounds};
use crate::error::{Error, Result};
use crate::installments::round_money;
use crate::models::{CardTotal, CategoryTotal, ChartFilter};

impl Database {
    fn chart_facts(&self, user_id: i64, filter: &ChartFilter) -> Result<Vec<InstallmentFact>> {
        let (from, to): (NaiveDate, NaiveDate) = match filter.month {
            Some(month) => month_bounds(filter.year, month)
                .ok_or_else(|| Error::Validation(format!("Invalid month: {}", month)))?,
            None => year_bounds(filter.year)
                .ok_or_else(|| Error::Validation(format!("Invalid year: {}", filter.year)))?,
        };

        let mut facts = self.installment_facts(user_id, from, to, filter.card_id)?;
        if !filter.category_ids.is_empty() {
            facts.retain(|f| filter.category_ids.contains(&f.category_id));
        }
        Ok(facts)
    }

    /// Installment totals for each month of the filter's year (12 entries)
    pub fn monthly_totals(&self, user_id: i64, filter: &ChartFilter) -> Result<Vec<Decimal>> {
        let year_filter = ChartFilter {
            month: None,
            ..filter.clone()
        };

        let mut months = [Decimal::ZERO; 12];
        for fact in self.chart_facts(user_id, &year_filter)? {
            months[fact.due_date.month0() as usize] += fact.amount;
        }

        Ok(months.iter().map(|m| round_money(*m)).collect())
    }

    /// Installment totals per category, largest first
    pub fn category_totals(&self, user_id: i64, filter: &ChartFilter) -> Result<Vec<CategoryTotal>> {
        let mut per_category: BTreeMap<i64, (String, Decimal)> = BTreeMap::new();
        for fact in self.chart_facts(user_id, filter)? {
            let entry = per_category
                .entry(fact.category_id)
                .or_insert_with(|| (fact.category_name.clone(), Decimal::ZERO));
            entry.1 += fact.amount;
        }

        let mut totals: Vec<CategoryTotal> = per_category
            .into_iter()
            .map(|(category_id, (category_name, total))| CategoryTotal {
                category_id,
                category_name,
                total: round_money(total),
            })
            .collect();
        totals.sort_by(|a, b| b.total.cmp(&a.total).then(a.category_id.cmp(&b.category_id)));

        Ok(totals)
    }

    /// Installment totals per card, largest first
    pub fn card_totals(&self, user_id: i64, filter: &ChartFilter) -> Result<Vec<CardTotal>> {
        let mut per_card: BTreeMap<i64, (String, Decimal)> = BTreeMap::new();
        for fact in self.chart_facts(user_id, filter)? {
            let entry = per_card
                .entry(fact.card_id)
                .or_insert_with(|| (fact.card_name.clone(), Decimal::ZERO));
            entry.1 += fact.amount;
        }

        let mut totals: Vec<CardTotal> = per_card
            .into_iter()
            .map(|(card_id, (card_name, total))| CardTotal {
                card_id,
                card_name,
                total: round_money(total),
            })
            .collect();
        totals.sort_by(|a, b| b.total.cmp(&a.total).then(a.card_id.cmp(&b.card_id)));

        Ok(totals)
    }
}
