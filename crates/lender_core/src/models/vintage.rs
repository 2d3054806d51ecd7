use serde::Serialize;

/// A defaulted loan forwarded to the collections partner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VintageRecord {
    pub loan_id: i32,
    pub loan_application_date: String,
    pub loan_defaulted_date: String,
    pub loan_bal: f64,
    pub customer_name: String,
    pub phone_number: String,
    pub national_id: String,
    pub branch: String,
    pub agent_email: String,
    pub loan_status: String,
}

impl VintageRecord {
    /// Query-string parameters of the collections notification call.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("customerName", self.customer_name.clone()),
            ("phoneNumber", self.phone_number.clone()),
            ("nationalId", self.national_id.clone()),
            ("loanId", self.loan_id.to_string()),
            ("loanApplicationDate", self.loan_application_date.clone()),
            ("loanDefaultedDate", self.loan_defaulted_date.clone()),
            ("loanBal", self.loan_bal.to_string()),
            ("agentEmail", self.agent_email.clone()),
            ("branch", self.branch.clone()),
            ("loanStatus", self.loan_status.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(bal: f64) -> VintageRecord {
        VintageRecord {
            loan_id: 881,
            loan_application_date: "2024-01-10".into(),
            loan_defaulted_date: "2024-03-10".into(),
            loan_bal: bal,
            customer_name: "Wanjiku Mwangi".into(),
            phone_number: "254712345678".into(),
            national_id: "28765432".into(),
            branch: "4".into(),
            agent_email: "agent@lender.test".into(),
            loan_status: "Overdue".into(),
        }
    }

    #[test]
    fn ten_parameters() {
        let pairs = record(1.0).query_pairs();
        assert_eq!(pairs.len(), 10);
        assert!(pairs.iter().any(|(k, v)| *k == "loanId" && v == "881"));
    }

    #[test]
    fn balance_uses_shortest_decimal() {
        let bal = |r: &VintageRecord| {
            r.query_pairs()
                .into_iter()
                .find(|(k, _)| *k == "loanBal")
                .map(|(_, v)| v)
        };
        assert_eq!(bal(&record(1500.0)).as_deref(), Some("1500"));
        assert_eq!(bal(&record(1500.25)).as_deref(), Some("1500.25"));
    }
}
