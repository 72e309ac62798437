//! Policy and policy request formatting

use crate::models::{Policy, PolicyId, PolicyRequest};

pub fn format_policy(id: &PolicyId, policy: &Policy) -> String {
    let mut output = String::new();
    output.push_str(&format!("Policy:                 {}\n", id));
    output.push_str(&format!("Max deposit:            {}\n", policy.max_deposit()));
    output.push_str(&format!("Max withdrawal:         {}\n", policy.max_withdrawal()));
    output.push_str(&format!(
        "Daily withdrawal limit: {} (not enforced)\n",
        policy.daily_withdrawal_limit()
    ));
    output.push_str(&format!(
        "Negative balance:       {}\n",
        if policy.allow_negative_balance() {
            format!("allowed down to -{}", policy.overdraft_limit())
        } else {
            "not allowed".to_string()
        }
    ));
    output
}

pub fn format_request_list(requests: &[PolicyRequest]) -> String {
    if requests.is_empty() {
        return "No policy requests.".to_string();
    }

    let mut output = String::new();
    output.push_str(&format!(
        "{:<12}  {:<12}  {:<8}  {:<16}  {}\n",
        "Request", "Account", "Status", "Created", "Requested"
    ));
    for request in requests {
        output.push_str(&format!(
            "{:<12}  {:<12}  {:<8}  {:<16}  {}\n",
            request.id.to_string(),
            request.account_id.to_string(),
            request.status.to_string(),
            request.created_at.format("%Y-%m-%d %H:%M").to_string(),
            request.requested_summary()
        ));
        if !request.justification.is_empty() {
            output.push_str(&format!("{:<12}  \"{}\"\n", "", request.justification));
        }
    }
    output
}
