//! Cost estimation for enrichment runs.

/// USD per 1M tokens, regular and batch-discounted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input_per_mtok: f64,
    pub output_per_mtok: f64,
    pub batch_input_per_mtok: f64,
    pub batch_output_per_mtok: f64,
}

const PRICING_TABLE: [(&str, ModelPricing); 4] = [
    (
        "gpt-4o",
        ModelPricing {
            input_per_mtok: 5.00,
            output_per_mtok: 15.00,
            batch_input_per_mtok: 2.50,
            batch_output_per_mtok: 7.50,
        },
    ),
    (
        "gpt-4o-2024-08-06",
        ModelPricing {
            input_per_mtok: 2.50,
            output_per_mtok: 10.00,
            batch_input_per_mtok: 1.25,
            batch_output_per_mtok: 5.00,
        },
    ),
    (
        "gpt-4o-2024-05-13",
        ModelPricing {
            input_per_mtok: 5.00,
            output_per_mtok: 15.00,
            batch_input_per_mtok: 2.50,
            batch_output_per_mtok: 7.50,
        },
    ),
    (
        "gpt-4o-mini",
        ModelPricing {
            input_per_mtok: 0.150,
            output_per_mtok: 0.600,
            batch_input_per_mtok: 0.075,
            batch_output_per_mtok: 0.300,
        },
    ),
];

pub fn pricing_for(model: &str) -> Option<ModelPricing> {
    PRICING_TABLE
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, pricing)| *pricing)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostEstimate {
    pub input_cost: f64,
    pub output_cost: f64,
    pub total: f64,
}

/// Estimated USD cost of a run. Unknown models yield `None` rather than a
/// silently wrong figure.
pub fn estimate_cost(
    model: &str,
    input_tokens: u64,
    output_tokens: u64,
    batch: bool,
) -> Option<CostEstimate> {
    let pricing = pricing_for(model)?;
    let (input_rate, output_rate) = if batch {
        (pricing.batch_input_per_mtok, pricing.batch_output_per_mtok)
    } else {
        (pricing.input_per_mtok, pricing.output_per_mtok)
    };
    let input_cost = input_tokens as f64 / 1_000_000.0 * input_rate;
    let output_cost = output_tokens as f64 / 1_000_000.0 * output_rate;
    Some(CostEstimate {
        input_cost,
        output_cost,
        total: input_cost + output_cost,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_rates_are_half_of_regular() {
        let estimate = estimate_cost("gpt-4o", 4_000_000, 500_000, false).unwrap();
        let batch_estimate = estimate_cost("gpt-4o", 4_000_000, 500_000, true).unwrap();
        assert!((estimate.total - 27.5).abs() < 1e-9);
        assert!((batch_estimate.total - 13.75).abs() < 1e-9);
    }

    #[test]
    fn test_mini_model_costs() {
        let estimate = estimate_cost("gpt-4o-mini", 1_000_000, 1_000_000, true).unwrap();
        assert!((estimate.input_cost - 0.075).abs() < 1e-9);
        assert!((estimate.output_cost - 0.300).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_model_is_none() {
        assert!(estimate_cost("gpt-unknown", 1, 1, false).is_none());
    }
}
