//! Domain models for Cuotas
//!
//! Field names on the wire follow the API's camelCase Spanish vocabulary
//! (`monto`, `fecha`, `tarjetaCreditoId`, ...), while the Rust fields use
//! English names.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Deserialize a field that distinguishes "absent" from "null".
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`: a
/// missing field stays `None`, an explicit `null` becomes `Some(None)`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ============================================================================
// Users
// ============================================================================

/// A registered user
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    #[serde(rename = "nombre")]
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Registration payload
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    #[serde(rename = "nombre")]
    pub name: String,
    pub email: String,
    pub password: String,
}

// ============================================================================
// Banks
// ============================================================================

/// A bank. Banks without an owner are global and visible to every user.
#[derive(Debug, Clone, Serialize)]
pub struct Bank {
    pub id: i64,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "pais")]
    pub country: Option<String>,
    #[serde(rename = "usuarioId")]
    pub user_id: Option<i64>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBank {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "pais", default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BankUpdate {
    #[serde(rename = "nombre", default)]
    pub name: Option<String>,
    #[serde(rename = "pais", default, deserialize_with = "double_option")]
    pub country: Option<Option<String>>,
}

// ============================================================================
// Categories
// ============================================================================

/// An expense category. Categories without an owner are global.
#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: i64,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    #[serde(rename = "usuarioId")]
    pub user_id: Option<i64>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "deletedAt", skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Category {
    pub fn is_global(&self) -> bool {
        self.user_id.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion", default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryUpdate {
    #[serde(rename = "nombre", default)]
    pub name: Option<String>,
    #[serde(rename = "descripcion", default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

// ============================================================================
// Cards
// ============================================================================

/// A credit card. Only the last four digits of the number are stored.
#[derive(Debug, Clone, Serialize)]
pub struct CreditCard {
    pub id: i64,
    #[serde(rename = "usuarioId")]
    pub user_id: i64,
    #[serde(rename = "bancoId")]
    pub bank_id: i64,
    #[serde(rename = "banco")]
    pub bank_name: String,
    #[serde(rename = "nombreTarjeta")]
    pub name: String,
    #[serde(rename = "ultimosDigitos")]
    pub last_four: String,
    #[serde(rename = "limiteCredito")]
    pub credit_limit: Decimal,
    /// Day of month the billing cycle closes
    #[serde(rename = "diaCierre")]
    pub closing_day: u32,
    /// Day of month the statement is due
    #[serde(rename = "diaVencimiento")]
    pub due_day: u32,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCreditCard {
    #[serde(rename = "bancoId")]
    pub bank_id: i64,
    #[serde(rename = "nombreTarjeta")]
    pub name: String,
    /// Full or partial card number; only the trailing four digits are kept
    #[serde(rename = "numeroTarjeta")]
    pub number: String,
    #[serde(rename = "limiteCredito")]
    pub credit_limit: Decimal,
    #[serde(rename = "diaCierre")]
    pub closing_day: u32,
    #[serde(rename = "diaVencimiento")]
    pub due_day: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreditCardUpdate {
    #[serde(rename = "bancoId", default)]
    pub bank_id: Option<i64>,
    #[serde(rename = "nombreTarjeta", default)]
    pub name: Option<String>,
    #[serde(rename = "numeroTarjeta", default)]
    pub number: Option<String>,
    #[serde(rename = "limiteCredito", default)]
    pub credit_limit: Option<Decimal>,
    #[serde(rename = "diaCierre", default)]
    pub closing_day: Option<u32>,
    #[serde(rename = "diaVencimiento", default)]
    pub due_day: Option<u32>,
}

/// A debit card
#[derive(Debug, Clone, Serialize)]
pub struct DebitCard {
    pub id: i64,
    #[serde(rename = "usuarioId")]
    pub user_id: i64,
    #[serde(rename = "bancoId")]
    pub bank_id: i64,
    #[serde(rename = "banco")]
    pub bank_name: String,
    #[serde(rename = "nombreTarjeta")]
    pub name: String,
    #[serde(rename = "ultimosDigitos")]
    pub last_four: String,
    #[serde(rename = "saldoDisponible")]
    pub available_balance: Decimal,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewDebitCard {
    #[serde(rename = "bancoId")]
    pub bank_id: i64,
    #[serde(rename = "nombreTarjeta")]
    pub name: String,
    #[serde(rename = "numeroTarjeta")]
    pub number: String,
    #[serde(rename = "saldoDisponible", default)]
    pub available_balance: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DebitCardUpdate {
    #[serde(rename = "bancoId", default)]
    pub bank_id: Option<i64>,
    #[serde(rename = "nombreTarjeta", default)]
    pub name: Option<String>,
    #[serde(rename = "numeroTarjeta", default)]
    pub number: Option<String>,
    #[serde(rename = "saldoDisponible", default)]
    pub available_balance: Option<Decimal>,
}

// ============================================================================
// Expenses
// ============================================================================

/// An expense, optionally charged to a credit or debit card
#[derive(Debug, Clone, Serialize)]
pub struct Expense {
    pub id: i64,
    #[serde(rename = "usuarioId")]
    pub user_id: i64,
    #[serde(rename = "monto")]
    pub amount: Decimal,
    #[serde(rename = "fecha")]
    pub date: NaiveDate,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    #[serde(rename = "categoriaGastoId")]
    pub category_id: i64,
    #[serde(rename = "categoria")]
    pub category_name: String,
    #[serde(rename = "tarjetaCreditoId")]
    pub credit_card_id: Option<i64>,
    #[serde(rename = "tarjetaDebitoId")]
    pub debit_card_id: Option<i64>,
    /// Name of whichever card the expense is charged to
    #[serde(rename = "nameCard")]
    pub card_name: Option<String>,
    #[serde(rename = "esEnCuotas")]
    pub is_installment: bool,
    /// Installment count; 0 unless charged to a credit card
    #[serde(rename = "cuotas")]
    pub total_installments: u32,
    /// Installments still outstanding as of the read
    #[serde(rename = "cuotasRestantes")]
    pub remaining_installments: u32,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Expense creation payload
#[derive(Debug, Clone, Deserialize)]
pub struct NewExpense {
    #[serde(rename = "monto")]
    pub amount: Decimal,
    #[serde(rename = "fecha")]
    pub date: NaiveDate,
    #[serde(rename = "descripcion", default)]
    pub description: Option<String>,
    #[serde(rename = "categoriaGastoId")]
    pub category_id: i64,
    #[serde(rename = "tarjetaCreditoId", default)]
    pub credit_card_id: Option<i64>,
    #[serde(rename = "tarjetaDebitoId", default)]
    pub debit_card_id: Option<i64>,
    /// Requested installment count, credit card only (defaults to 1)
    #[serde(rename = "numeroCuotas", default)]
    pub installments: Option<u32>,
}

/// Partial expense update. Card references are tri-state: absent keeps the
/// current value, `null` clears it, a number sets it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpenseUpdate {
    #[serde(rename = "monto", default)]
    pub amount: Option<Decimal>,
    #[serde(rename = "fecha", default)]
    pub date: Option<NaiveDate>,
    #[serde(rename = "descripcion", default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(rename = "categoriaGastoId", default)]
    pub category_id: Option<i64>,
    #[serde(rename = "tarjetaCreditoId", default, deserialize_with = "double_option")]
    pub credit_card_id: Option<Option<i64>>,
    #[serde(rename = "tarjetaDebitoId", default, deserialize_with = "double_option")]
    pub debit_card_id: Option<Option<i64>>,
    #[serde(rename = "numeroCuotas", default)]
    pub installments: Option<u32>,
}

/// Filters for a card's expense listing
#[derive(Debug, Clone, Default)]
pub struct CardExpenseFilter {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub category_id: Option<i64>,
    /// Only expenses with exactly this many installments remaining
    pub remaining: Option<u32>,
    pub sort: ExpenseSort,
    pub descending: bool,
    pub page: u32,
    pub limit: u32,
}

/// Whitelisted sort columns for expense listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExpenseSort {
    #[default]
    Date,
    Amount,
    Description,
}

impl ExpenseSort {
    pub fn column(&self) -> &'static str {
        match self {
            Self::Date => "e.date",
            Self::Amount => "CAST(e.amount AS REAL)",
            Self::Description => "e.description",
        }
    }
}

impl std::str::FromStr for ExpenseSort {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "fecha" | "date" => Ok(Self::Date),
            "monto" | "amount" => Ok(Self::Amount),
            "descripcion" | "description" => Ok(Self::Description),
            _ => Err(format!("Unknown sort field: {}", s)),
        }
    }
}

/// A page of results plus the unpaged count
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: i64,
}

/// Filters for the credit-card expense dashboard
#[derive(Debug, Clone, Default)]
pub struct DashboardFilter {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub category_id: Option<i64>,
    pub card_id: Option<i64>,
}

/// Expense row for the credit-card dashboard
#[derive(Debug, Clone, Serialize)]
pub struct DashboardExpense {
    pub id: i64,
    #[serde(rename = "monto")]
    pub amount: Decimal,
    #[serde(rename = "fecha")]
    pub date: NaiveDate,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    #[serde(rename = "categoriaGastoId")]
    pub category_id: i64,
    #[serde(rename = "categoria")]
    pub category_name: String,
    #[serde(rename = "tarjetaCreditoId")]
    pub card_id: i64,
    #[serde(rename = "nombreTarjeta")]
    pub card_name: String,
    #[serde(rename = "cuotas")]
    pub total_installments: u32,
}

/// One installment of a card's expenses, labelled `"n/N"`
#[derive(Debug, Clone, Serialize)]
pub struct CardInstallmentRow {
    #[serde(rename = "gastoId")]
    pub expense_id: i64,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    #[serde(rename = "categoria")]
    pub category_name: String,
    #[serde(rename = "fechaGasto")]
    pub expense_date: NaiveDate,
    #[serde(rename = "fechaVencimiento")]
    pub due_date: NaiveDate,
    #[serde(rename = "monto")]
    pub amount: Decimal,
    #[serde(rename = "cuota")]
    pub label: String,
    #[serde(rename = "pagada")]
    pub paid: bool,
}

// ============================================================================
// Installments
// ============================================================================

/// A persisted installment
#[derive(Debug, Clone, Serialize)]
pub struct Installment {
    pub id: i64,
    #[serde(rename = "gastoId")]
    pub expense_id: i64,
    #[serde(rename = "numeroCuota")]
    pub number: u32,
    #[serde(rename = "monto")]
    pub amount: Decimal,
    #[serde(rename = "fechaVencimiento")]
    pub due_date: NaiveDate,
    #[serde(rename = "pagada")]
    pub paid: bool,
}

/// Installment with the card and expense context used by listings
#[derive(Debug, Clone, Serialize)]
pub struct InstallmentListItem {
    #[serde(flatten)]
    pub installment: Installment,
    #[serde(rename = "totalCuotas")]
    pub total_installments: u32,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    #[serde(rename = "tarjetaCreditoId")]
    pub card_id: i64,
    #[serde(rename = "nombreTarjeta")]
    pub card_name: String,
}

/// Filters for the installment listing
#[derive(Debug, Clone, Default)]
pub struct InstallmentFilter {
    pub card_id: Option<i64>,
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub paid: Option<bool>,
    pub page: u32,
    pub limit: u32,
}

// ============================================================================
// Summaries
// ============================================================================

/// Installments due this month on one card
#[derive(Debug, Clone, Serialize)]
pub struct CardMonthTotal {
    #[serde(rename = "tarjetaId")]
    pub card_id: i64,
    #[serde(rename = "nombreTarjeta")]
    pub card_name: String,
    #[serde(rename = "totalMes")]
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthInstallmentTotal {
    #[serde(rename = "mes")]
    pub month: u32,
    #[serde(rename = "totalCuotas")]
    pub total: Decimal,
}

/// Twelve months of installment totals for one card
#[derive(Debug, Clone, Serialize)]
pub struct CardAnnualSummary {
    #[serde(rename = "tarjetaId")]
    pub card_id: i64,
    #[serde(rename = "nombreTarjeta")]
    pub card_name: String,
    #[serde(rename = "anio")]
    pub year: i32,
    #[serde(rename = "resumenMensual")]
    pub months: Vec<MonthInstallmentTotal>,
    #[serde(rename = "totalAnual")]
    pub annual_total: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnnualSummary {
    #[serde(rename = "resumenPorTarjeta")]
    pub cards: Vec<CardAnnualSummary>,
    #[serde(rename = "totalGeneral")]
    pub grand_total: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthSpendTotal {
    #[serde(rename = "mes")]
    pub month: u32,
    #[serde(rename = "totalGasto")]
    pub total: Decimal,
}

/// Twelve months of installment totals across every card
#[derive(Debug, Clone, Serialize)]
pub struct GeneralAnnualSummary {
    #[serde(rename = "anio")]
    pub year: i32,
    #[serde(rename = "resumenMensual")]
    pub months: Vec<MonthSpendTotal>,
    #[serde(rename = "totalAnual")]
    pub annual_total: Decimal,
}

/// One month of a card's detailed breakdown
#[derive(Debug, Clone, Serialize)]
pub struct MonthBreakdown {
    #[serde(rename = "mes")]
    pub month: u32,
    /// First installments due this month
    #[serde(rename = "gastoActual")]
    pub new_expense: Decimal,
    /// Later installments of earlier expenses due this month
    #[serde(rename = "montoCuotas")]
    pub carry_over: Decimal,
    #[serde(rename = "totalMes")]
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct CardMonthlyBreakdown {
    #[serde(rename = "tarjetaId")]
    pub card_id: i64,
    #[serde(rename = "banco")]
    pub bank_name: String,
    #[serde(rename = "nombreTarjeta")]
    pub card_name: String,
    #[serde(rename = "anio")]
    pub year: i32,
    #[serde(rename = "resumenMensual")]
    pub months: Vec<MonthBreakdown>,
    #[serde(rename = "totalAnual")]
    pub annual_total: Decimal,
}

/// Unpaid future installments of one expense
#[derive(Debug, Clone, Serialize)]
pub struct PendingExpense {
    #[serde(rename = "gastoId")]
    pub expense_id: i64,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    #[serde(rename = "fechaGasto")]
    pub expense_date: NaiveDate,
    #[serde(rename = "montoCuota")]
    pub installment_amount: Decimal,
    #[serde(rename = "cuotasPendientes")]
    pub pending_count: u32,
    #[serde(rename = "totalFaltante")]
    pub pending_total: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingInstallmentsReport {
    #[serde(rename = "detalles")]
    pub expenses: Vec<PendingExpense>,
    #[serde(rename = "totalGeneral")]
    pub grand_total: Decimal,
}

/// Credit limit usage of one card
#[derive(Debug, Clone, Serialize)]
pub struct CreditCardDetail {
    #[serde(flatten)]
    pub card: CreditCard,
    #[serde(rename = "consumoMesActual")]
    pub current_month: Decimal,
    #[serde(rename = "totalPendiente")]
    pub pending_total: Decimal,
    #[serde(rename = "disponible")]
    pub available: Decimal,
}

// ============================================================================
// Charts
// ============================================================================

/// Filters shared by the chart aggregations
#[derive(Debug, Clone, Default)]
pub struct ChartFilter {
    pub year: i32,
    /// Restrict to one month (1-12)
    pub month: Option<u32>,
    pub card_id: Option<i64>,
    /// Restrict to these categories; empty means all
    pub category_ids: Vec<i64>,
}

/// Installment sum for one category
#[derive(Debug, Clone, Serialize)]
pub struct CategoryTotal {
    #[serde(rename = "categoriaId")]
    pub category_id: i64,
    #[serde(rename = "categoria")]
    pub category_name: String,
    pub total: Decimal,
}

/// Installment sum for one card
#[derive(Debug, Clone, Serialize)]
pub struct CardTotal {
    #[serde(rename = "tarjetaId")]
    pub card_id: i64,
    #[serde(rename = "nombreTarjeta")]
    pub card_name: String,
    pub total: Decimal,
}

// ============================================================================
// Audit
// ============================================================================

/// Audit log entry
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: String,
    pub user_id: Option<i64>,
    pub action: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expense_update_tri_state() {
        let absent: ExpenseUpdate = serde_json::from_str(r#"{"monto": 10}"#).unwrap();
        assert_eq!(absent.credit_card_id, None);

        let cleared: ExpenseUpdate =
            serde_json::from_str(r#"{"tarjetaCreditoId": null}"#).unwrap();
        assert_eq!(cleared.credit_card_id, Some(None));

        let set: ExpenseUpdate = serde_json::from_str(r#"{"tarjetaCreditoId": 7}"#).unwrap();
        assert_eq!(set.credit_card_id, Some(Some(7)));
    }

    #[test]
    fn test_new_expense_wire_names() {
        let json = r#"{
            "monto": 1500.75,
            "fecha": "2025-04-14",
            "categoriaGastoId": 3,
            "tarjetaCreditoId": 9,
            "numeroCuotas": 3
        }"#;
        let expense: NewExpense = serde_json::from_str(json).unwrap();
        assert_eq!(expense.amount.to_string(), "1500.75");
        assert_eq!(expense.credit_card_id, Some(9));
        assert_eq!(expense.debit_card_id, None);
        assert_eq!(expense.installments, Some(3));
    }

    #[test]
    fn test_expense_sort_parse() {
        assert_eq!("monto".parse::<ExpenseSort>().unwrap(), ExpenseSort::Amount);
        assert_eq!("fecha".parse::<ExpenseSort>().unwrap(), ExpenseSort::Date);
        assert!("id; DROP TABLE".parse::<ExpenseSort>().is_err());
    }
}
