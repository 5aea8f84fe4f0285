//! Property checks over randomly generated scenarios.

use proptest::prelude::*;
use structree_core::Rational;
use structree_harness::{HarnessError, ScenarioConfig, render_ascii, run_scenario};
use structree_tree::Structor;

const RATES: [(i64, i64); 4] = [(1, 2), (1, 1), (3, 2), (2, 1)];

fn r(numerator: i64, denominator: i64) -> Rational {
    Rational::new(numerator, denominator).expect("test rational must be valid")
}

fn structor_strategy() -> impl Strategy<Value = Structor> {
    (
        0usize..RATES.len(),
        -6i64..=6,
        1i64..=3,
        proptest::option::of("[a-z]{1,6}"),
    )
        .prop_map(|(rate_index, numerator, denominator, name)| {
            let (rate_n, rate_d) = RATES[rate_index];
            let structor = Structor::new(r(rate_n, rate_d), r(numerator, denominator));
            match name {
                Some(name) => structor.named(name),
                None => structor,
            }
        })
}

fn scenario_strategy() -> impl Strategy<Value = ScenarioConfig> {
    (
        0usize..RATES.len(),
        1u32..=3,
        prop::collection::vec(structor_strategy(), 1..4),
    )
        .prop_map(|(rate_index, iterations, structors)| {
            let (rate_n, rate_d) = RATES[rate_index];
            ScenarioConfig {
                initial_rate: r(rate_n, rate_d),
                iterations,
                structors,
            }
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn scenario_json_round_trips(config in scenario_strategy()) {
        let json = serde_json::to_string_pretty(&config).expect("serialize");
        let loaded = ScenarioConfig::from_json_str(&json).expect("reload");
        prop_assert_eq!(loaded, config);
    }

    #[test]
    fn reports_conserve_applied_weight(config in scenario_strategy()) {
        let report = match run_scenario(&config) {
            Ok(report) => report,
            // Deep trees at large rates may leave i64 range.
            Err(HarnessError::Growth { .. }) => return Ok(()),
            Err(error) => return Err(TestCaseError::fail(error.to_string())),
        };
        prop_assert_eq!(report.steps.len(), config.applications());

        let mut applied = Rational::ZERO;
        for (step, structor) in report
            .steps
            .iter()
            .zip(config.structors.iter().cycle())
        {
            applied = applied + structor.magnitude();
            prop_assert_eq!(&step.structor, structor);
            prop_assert_eq!(step.total_weight, applied);
        }
        prop_assert_eq!(report.stats.total_weight, applied);
        prop_assert_eq!(report.snapshot.validate(), Ok(()));
        prop_assert_eq!(render_ascii(&report.snapshot).lines().count(), report.stats.nodes);
    }
}
