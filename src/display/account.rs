//! Account display formatting

use crate::models::Money;
use crate::services::account::AccountSummary;
use crate::storage::AccountRecord;

/// Format accounts with balances as a table
pub fn format_account_list(records: &[AccountRecord]) -> String {
    if records.is_empty() {
        return "No accounts found.".to_string();
    }

    let name_width = records
        .iter()
        .map(|r| r.name.chars().count())
        .max()
        .unwrap_or(4)
        .max(4);

    let mut output = String::new();
    output.push_str(&format!(
        "{:<12}  {:<name_width$}  {:>12}  {}\n",
        "Id",
        "Name",
        "Balance",
        "Policy",
        name_width = name_width,
    ));
    output.push_str(&format!(
        "{:-<12}  {:-<name_width$}  {:->12}  {:-<16}\n",
        "",
        "",
        "",
        "",
        name_width = name_width,
    ));

    for record in records {
        output.push_str(&format!(
            "{:<12}  {:<name_width$}  {:>12}  {}\n",
            record.id.to_string(),
            record.name,
            record.balance.to_string(),
            record.policy_id,
            name_width = name_width,
        ));
    }

    let total: Money = records.iter().map(|r| r.balance).sum();
    output.push_str(&format!(
        "{:<12}  {:<name_width$}  {:>12}\n",
        "",
        "Total",
        total.to_string(),
        name_width = name_width,
    ));

    output
}

/// Format a single account's details
pub fn format_account_details(summary: &AccountSummary) -> String {
    let record = &summary.record;
    let mut output = String::new();

    output.push_str(&format!("Account:    {}\n", record.name));
    output.push_str(&format!("ID:         {}\n", record.id.as_uuid()));
    if let Some(user) = &summary.username {
        output.push_str(&format!("Username:   {}\n", user.username));
    }
    output.push_str(&format!("Balance:    {}\n", record.balance));
    output.push_str(&format!("Opened at:  {}\n", record.opening_balance));
    output.push_str(&format!("Policy:     {} ({})\n", record.policy_id, summary.policy));
    output.push_str(&format!(
        "Ledger:     {} transactions ({} declined)\n",
        summary.transaction_count, summary.declined_count
    ));
    output.push_str(&format!("Version:    {}\n", record.version));
    output.push_str(&format!(
        "Created:    {}\n",
        record.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    output
}
