//! Seeded generator of synthetic telecom customer records.
//!
//! The same `(records, seed)` pair always yields the same frame. Churn is
//! drawn against a logistic risk score so the label correlates with contract
//! type, tenure, fibre internet, age and paperless billing, at roughly a
//! 27% positive rate.

use crate::error::{ChurnError, Result};
use polars::prelude::*;
use rand::distributions::{Distribution as _, Uniform, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng as _, SeedableRng as _};

pub const YES_NO: [&str; 2] = ["Yes", "No"];
pub const CONTRACTS: [&str; 3] = ["Month-to-month", "One year", "Two year"];
pub const INTERNET_SERVICES: [&str; 3] = ["DSL", "Fiber optic", "No"];
pub const PAYMENT_METHODS: [&str; 4] = [
    "Electronic check",
    "Mailed check",
    "Bank transfer (automatic)",
    "Credit card (automatic)",
];
const MULTIPLE_LINES: [&str; 3] = ["Yes", "No", "No phone service"];
const INTERNET_ADDONS: [&str; 3] = ["Yes", "No", "No internet service"];

pub const MIN_TENURE: i64 = 1;
pub const MAX_TENURE: i64 = 72;

const CHURN_INTERCEPT: f64 = -2.3;

/// A categorical field with fixed draw weights.
struct Choice {
    values: &'static [&'static str],
    dist: WeightedIndex<f64>,
}

impl Choice {
    fn new(values: &'static [&'static str], weights: &[f64]) -> Result<Self> {
        let dist = WeightedIndex::new(weights)
            .map_err(|e| ChurnError::Other(format!("Invalid mock weights: {e}")))?;
        Ok(Self { values, dist })
    }

    fn uniform(values: &'static [&'static str]) -> Result<Self> {
        Self::new(values, &vec![1.0; values.len()])
    }

    fn pick(&self, rng: &mut StdRng) -> &'static str {
        // the distribution has one weight per value
        self.values
            .get(self.dist.sample(rng))
            .copied()
            .unwrap_or_default()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Probability that a customer with these attributes churns.
pub fn churn_probability(
    contract: &str,
    tenure: i64,
    internet: &str,
    senior: bool,
    paperless: bool,
) -> f64 {
    let mut z = CHURN_INTERCEPT;
    if contract == "Month-to-month" {
        z += 1.2;
    }
    if tenure < 12 {
        z += 0.9;
    }
    if internet == "Fiber optic" {
        z += 0.5;
    }
    if senior {
        z += 0.4;
    }
    if paperless {
        z += 0.2;
    }
    sigmoid(z)
}

#[derive(Default)]
struct MockColumns {
    customer_id: Vec<String>,
    gender: Vec<&'static str>,
    senior_citizen: Vec<i64>,
    partner: Vec<&'static str>,
    dependents: Vec<&'static str>,
    tenure: Vec<i64>,
    phone_service: Vec<&'static str>,
    multiple_lines: Vec<&'static str>,
    internet_service: Vec<&'static str>,
    online_security: Vec<&'static str>,
    online_backup: Vec<&'static str>,
    device_protection: Vec<&'static str>,
    tech_support: Vec<&'static str>,
    streaming_tv: Vec<&'static str>,
    streaming_movies: Vec<&'static str>,
    contract: Vec<&'static str>,
    paperless_billing: Vec<&'static str>,
    payment_method: Vec<&'static str>,
    monthly_charges: Vec<f64>,
    total_charges: Vec<f64>,
    churn: Vec<&'static str>,
}

/// Generates `records` customers from `seed`.
pub fn generate(records: usize, seed: u64) -> Result<DataFrame> {
    let mut rng = StdRng::seed_from_u64(seed);

    let gender = Choice::uniform(&["Male", "Female"])?;
    let senior = Choice::new(&["0", "1"], &[0.84, 0.16])?;
    let partner = Choice::new(&YES_NO, &[0.48, 0.52])?;
    let dependents = Choice::new(&YES_NO, &[0.30, 0.70])?;
    let phone = Choice::new(&YES_NO, &[0.90, 0.10])?;
    let lines = Choice::uniform(&MULTIPLE_LINES)?;
    let internet = Choice::new(&INTERNET_SERVICES, &[0.34, 0.44, 0.22])?;
    let addon = Choice::uniform(&INTERNET_ADDONS)?;
    let contract = Choice::new(&CONTRACTS, &[0.55, 0.21, 0.24])?;
    let paperless = Choice::new(&YES_NO, &[0.59, 0.41])?;
    let payment = Choice::new(&PAYMENT_METHODS, &[0.34, 0.23, 0.22, 0.21])?;
    let monthly = Uniform::new(18.0, 120.0);
    let noise = Uniform::new(-50.0, 50.0);

    let mut cols = MockColumns::default();
    for idx in 0..records {
        let is_senior = senior.pick(&mut rng) == "1";
        let tenure = rng.gen_range(MIN_TENURE..=MAX_TENURE);
        let internet_service = internet.pick(&mut rng);
        let contract_type = contract.pick(&mut rng);
        let paperless_billing = paperless.pick(&mut rng);
        let monthly_charge = monthly.sample(&mut rng);
        let total_charge = (tenure as f64 * monthly_charge + noise.sample(&mut rng)).max(0.0);

        let p = churn_probability(
            contract_type,
            tenure,
            internet_service,
            is_senior,
            paperless_billing == "Yes",
        );
        let churned = rng.gen_range(0.0..1.0) < p;

        cols.customer_id.push(format!("CUST{:05}", idx + 1));
        cols.gender.push(gender.pick(&mut rng));
        cols.senior_citizen.push(i64::from(is_senior));
        cols.partner.push(partner.pick(&mut rng));
        cols.dependents.push(dependents.pick(&mut rng));
        cols.tenure.push(tenure);
        cols.phone_service.push(phone.pick(&mut rng));
        cols.multiple_lines.push(lines.pick(&mut rng));
        cols.internet_service.push(internet_service);
        cols.online_security.push(addon.pick(&mut rng));
        cols.online_backup.push(addon.pick(&mut rng));
        cols.device_protection.push(addon.pick(&mut rng));
        cols.tech_support.push(addon.pick(&mut rng));
        cols.streaming_tv.push(addon.pick(&mut rng));
        cols.streaming_movies.push(addon.pick(&mut rng));
        cols.contract.push(contract_type);
        cols.paperless_billing.push(paperless_billing);
        cols.payment_method.push(payment.pick(&mut rng));
        cols.monthly_charges.push(round2(monthly_charge));
        cols.total_charges.push(round2(total_charge));
        cols.churn.push(if churned { "Yes" } else { "No" });
    }

    let df = df!(
        "CustomerID" => cols.customer_id,
        "Gender" => cols.gender,
        "SeniorCitizen" => cols.senior_citizen,
        "Partner" => cols.partner,
        "Dependents" => cols.dependents,
        "tenure" => cols.tenure,
        "PhoneService" => cols.phone_service,
        "MultipleLines" => cols.multiple_lines,
        "InternetService" => cols.internet_service,
        "OnlineSecurity" => cols.online_security,
        "OnlineBackup" => cols.online_backup,
        "DeviceProtection" => cols.device_protection,
        "TechSupport" => cols.tech_support,
        "StreamingTV" => cols.streaming_tv,
        "StreamingMovies" => cols.streaming_movies,
        "Contract" => cols.contract,
        "PaperlessBilling" => cols.paperless_billing,
        "PaymentMethod" => cols.payment_method,
        "MonthlyCharges" => cols.monthly_charges,
        "TotalCharges" => cols.total_charges,
        "Churn" => cols.churn
    )?;

    Ok(df)
}
