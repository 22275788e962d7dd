//! Demonstration of the Sentinel Sensor Agent pipeline.
//!
//! This example shows how to:
//! 1. Generate seeded normal-operation training data
//! 2. Fit the pipeline and inject an overheating failure into a test stream
//! 3. Feed the stream one reading at a time and watch alerts persist
//! 4. Check the stream for drift against the training reference
//!
//! Run with: cargo run --example pipeline_demo

use sentinel_sensor_agent::{
    audit::create_shared_log,
    simulation::{normal_operation, FailureInjector},
    Config, InspectionPipeline,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Sentinel Sensor Agent - Pipeline Demo");
    println!("=====================================");
    println!();

    let config = Config::default();
    let channels = config.features.channels.clone();
    let audit = create_shared_log();

    let training = normal_operation(500, &channels, 42)?;
    let test = FailureInjector::default().inject_overheating(
        &normal_operation(300, &channels, 43)?,
        "temperature",
        150,
    )?;

    let mut pipeline = InspectionPipeline::new(config)?.with_audit_log(audit.clone());
    pipeline.fit(&training)?;
    println!("Fitted {} on {} rows", pipeline.scorer_name(), training.len());
    println!("Overheating injected from row 150");
    println!();

    // Stream the test data reading by reading
    let columns = channels
        .iter()
        .map(|c| test.channel(c))
        .collect::<Result<Vec<_>, _>>()?;
    let mut alerting = false;
    for (row, &index) in test.index().iter().enumerate() {
        let reading: Vec<f64> = columns.iter().map(|values| values[row]).collect();
        let Some(assessment) = pipeline.process_reading(index, &reading)? else {
            continue;
        };
        if assessment.alert != alerting {
            alerting = assessment.alert;
            println!(
                "[{index:>4}] {} (risk {:.3})",
                if alerting { "ALERT: inspect equipment" } else { "cleared" },
                assessment.risk
            );
        }
    }
    println!();

    for drift in pipeline.check_drift(&test)? {
        println!(
            "{:<18} reference {:.3} current {:.3} {}",
            drift.channel,
            drift.report.reference_mean,
            drift.report.current_mean,
            if drift.report.exceeded { "DRIFT" } else { "ok" }
        );
    }

    println!();
    println!("{}", audit.summary());
    Ok(())
}
