use netdpsyn::{plan_budget, SynthesisConfig, ZcdpConversion};

fn main() {
    let num_records = 100_000usize;
    let num_attributes = 11usize;

    for conversion in [
        ZcdpConversion::BunSteinke,
        ZcdpConversion::Renyi,
        ZcdpConversion::AnalyticGaussian,
    ] {
        let mut config = SynthesisConfig::new(2.0);
        config.conversion = conversion;
        let plan = plan_budget(&config, num_records, num_attributes).expect("budget plan");
        println!(
            "{:>17}: total rho {:.6}, publish rho {:.6}, binning sigma {:.4}",
            conversion.as_str(),
            plan.rho().total(),
            plan.rho().publish(),
            plan.binning_sigma()
        );
    }
}
