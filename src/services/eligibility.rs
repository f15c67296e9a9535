use crate::models::loan::{EmploymentType, LoanDraft, ResidenceType};
use serde::Serialize;
use utoipa::ToSchema;

const ANNUAL_RATE: f64 = 0.14;
const MIN_AGE: u32 = 21;
const MAX_AGE: u32 = 60;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EligibilityDecision {
    pub eligible: bool,
    pub emi_needed: i64,
    pub capacity: f64,
    pub boosted_capacity: i64,
}

impl EligibilityDecision {
    pub fn prediction(&self) -> &'static str {
        if self.eligible {
            "eligible"
        } else {
            "ineligible"
        }
    }
}

/// Score a loan draft. Pure and deterministic: monthly EMI from the standard
/// amortization formula at 14% APR, repayment capacity adjusted by additive
/// profile boosts, then compared against the required EMI.
pub fn evaluate(draft: &LoanDraft) -> EligibilityDecision {
    let amount = draft.amount;
    let term = draft.term_months;
    let age = draft.age;

    let r = ANNUAL_RATE / 12.0;
    let emi_needed = if term > 0 && amount > 0.0 {
        let factor = (1.0 + r).powi(term as i32);
        (amount * r * factor / (factor - 1.0)).round() as i64
    } else {
        0
    };

    let capacity = (draft.income - draft.existing_emi).max(0.0);

    let mut boost: f64 = 0.0;

    // Age brackets: prime earning years score highest, the edges carry risk.
    if age < 21 {
        boost -= 0.10;
    } else if age < 25 {
        boost -= 0.05;
    } else if age <= 45 {
        boost += 0.08;
    } else if age <= 55 {
        boost += 0.05;
    } else if age <= 60 {
        boost += 0.02;
    } else {
        boost -= 0.15;
    }

    let credit = draft.credit_score;
    if credit >= 800 {
        boost += 0.12;
    } else if credit >= 750 {
        boost += 0.08;
    } else if credit >= 700 {
        boost += 0.04;
    }

    match draft.employment_type {
        EmploymentType::Salaried => boost += 0.05,
        EmploymentType::SelfEmployed => boost += 0.02,
        EmploymentType::Student => boost -= 0.10,
        EmploymentType::Retired => boost -= 0.05,
        EmploymentType::Other => {}
    }

    match draft.residence_type {
        ResidenceType::Owned => boost += 0.03,
        ResidenceType::Parental => boost += 0.01,
        ResidenceType::Rented | ResidenceType::Other => {}
    }

    let boosted_capacity = (capacity * (1.0 + boost)).round() as i64;

    let eligible = boosted_capacity >= emi_needed
        && amount > 0.0
        && term > 0
        && (MIN_AGE..=MAX_AGE).contains(&age);

    EligibilityDecision {
        eligible,
        emi_needed,
        capacity,
        boosted_capacity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> LoanDraft {
        LoanDraft {
            amount: 200_000.0,
            term_months: 24,
            income: 60_000.0,
            existing_emi: 5_000.0,
            credit_score: 760,
            age: 32,
            employment_type: EmploymentType::Salaried,
            residence_type: ResidenceType::Owned,
            purpose: None,
            full_name: None,
            email: None,
        }
    }

    #[test]
    fn strong_profile_is_eligible() {
        let d = evaluate(&draft());
        assert!(d.eligible);
        assert!(d.emi_needed > 0);
        assert!(d.boosted_capacity > d.emi_needed);
    }

    #[test]
    fn emi_matches_amortization_formula() {
        // 200k over 24 months at 14% APR: EMI rounds to 9603.
        let d = evaluate(&draft());
        assert_eq!(d.emi_needed, 9603);
    }

    #[test]
    fn capacity_floor_is_zero() {
        let mut input = draft();
        input.income = 1_000.0;
        input.existing_emi = 5_000.0;
        let d = evaluate(&input);
        assert_eq!(d.capacity, 0.0);
        assert!(!d.eligible);
    }

    #[test]
    fn age_window_is_enforced() {
        let mut input = draft();
        input.age = 19;
        assert!(!evaluate(&input).eligible);
        input.age = 61;
        assert!(!evaluate(&input).eligible);
        input.age = 21;
        input.income = 1_000_000.0;
        assert!(evaluate(&input).eligible);
    }

    #[test]
    fn zero_amount_or_term_is_ineligible() {
        let mut input = draft();
        input.amount = 0.0;
        assert!(!evaluate(&input).eligible);

        let mut input = draft();
        input.term_months = 0;
        let d = evaluate(&input);
        assert_eq!(d.emi_needed, 0);
        assert!(!d.eligible);
    }

    #[test]
    fn boosts_are_additive() {
        // Same capacity, better profile -> higher boosted capacity.
        let weak = LoanDraft {
            credit_score: 600,
            employment_type: EmploymentType::Student,
            residence_type: ResidenceType::Rented,
            ..draft()
        };
        let strong = LoanDraft {
            credit_score: 810,
            employment_type: EmploymentType::Salaried,
            residence_type: ResidenceType::Owned,
            ..draft()
        };
        assert!(evaluate(&strong).boosted_capacity > evaluate(&weak).boosted_capacity);
    }

    #[test]
    fn determinism() {
        let a = evaluate(&draft());
        let b = evaluate(&draft());
        assert_eq!(a.emi_needed, b.emi_needed);
        assert_eq!(a.boosted_capacity, b.boosted_capacity);
        assert_eq!(a.eligible, b.eligible);
    }
}
