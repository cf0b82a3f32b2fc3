//! Simulates a tilting rig to verify the suspension response end to end
//!
//! Walks the controller through LEVEL → ROLL → PITCH → RETUNE → LEVEL at a
//! 5 ms control period with accelerometer noise, printing corner positions
//! and checking each phase settles where the mixer says it should.
//!
//! The retune phase goes through the remote configuration channel, exactly
//! like a browser form submission would.
//!
//! Run with: cargo run -p suspension-core --example rig_sim

use std::sync::Arc;

use suspension_core::sim::{gravity, NoiseGen};
use suspension_core::{
    AccelSample, ActuatorSink, ConfigChannel, ConfigState, Corner, MemoryStore, PerCorner,
    SuspensionController,
};

const DT: f32 = 0.005;

/// Servo stand-in that keeps the last command per corner
#[derive(Default)]
struct Servos {
    commands: PerCorner<u16>,
}

impl ActuatorSink for Servos {
    fn write(&mut self, corner: Corner, position: u16) {
        self.commands[corner] = position;
    }
}

/// Gravity vector of a rig tilted by `roll`/`pitch` degrees, with noise
fn tilted(roll_deg: f32, pitch_deg: f32, noise: &mut NoiseGen) -> AccelSample {
    let g = gravity(roll_deg, pitch_deg);
    AccelSample::new(
        g.ax + noise.next(0.01),
        g.ay + noise.next(0.01),
        g.az + noise.next(0.01),
    )
}

fn run_phase(
    controller: &mut SuspensionController,
    channel: &ConfigChannel<MemoryStore>,
    servos: &mut Servos,
    noise: &mut NoiseGen,
    (roll, pitch): (f32, f32),
    seconds: f32,
) {
    let ticks = (seconds / DT) as usize;
    for i in 0..ticks {
        if let Some(update) = channel.state().take_pending_update() {
            controller.apply_parameter_update(&update);
        }
        controller.tick(tilted(roll, pitch, noise), DT, servos);
        channel.state().publish_telemetry(controller.snapshot_telemetry());

        if (i + 1) % 200 == 0 {
            let p = controller.positions();
            println!(
                "  t={:.1}s: FL={:.1} FR={:.1} RL={:.1} RR={:.1}",
                (i + 1) as f32 * DT,
                p[Corner::FrontLeft],
                p[Corner::FrontRight],
                p[Corner::RearLeft],
                p[Corner::RearRight]
            );
        }
    }
}

/// Compare settled positions against the last targets
fn check_settled(controller: &SuspensionController, tolerance: f32) {
    let targets = controller.last_targets();
    let mut worst: f32 = 0.0;
    for (corner, &position) in controller.positions().iter() {
        worst = worst.max((position - targets[corner]).abs());
    }
    if worst < tolerance {
        println!("    ✓ PASS: settled within {:.2}° of target", worst);
    } else {
        println!("    ⚠️  WARNING: {:.2}° from target after phase", worst);
    }
}

fn main() {
    let state = Arc::new(ConfigState::default());
    let channel = ConfigChannel::new(state.clone(), MemoryStore::new());
    let mut controller = SuspensionController::new(channel.current());
    let mut servos = Servos::default();
    let mut noise = NoiseGen::new(42);

    println!("=== Four-Corner Suspension Rig Simulation ===\n");
    println!("This simulates: LEVEL → ROLL → PITCH → RETUNE → LEVEL\n");

    println!("Phase 1: LEVEL (2s)");
    run_phase(&mut controller, &channel, &mut servos, &mut noise, (0.0, 0.0), 2.0);
    check_settled(&controller, 1.0);
    println!();

    println!("Phase 2: ROLL RIGHT 15° (4s)");
    println!("  Right corners should rise, left corners drop by half the travel");
    run_phase(&mut controller, &channel, &mut servos, &mut noise, (15.0, 0.0), 4.0);
    check_settled(&controller, 1.0);
    println!();

    println!("Phase 3: PITCH 10° (4s)");
    println!("  Rear axle answers with the opposite sign, scaled by rearBalance");
    run_phase(&mut controller, &channel, &mut servos, &mut noise, (0.0, 10.0), 4.0);
    check_settled(&controller, 1.0);
    println!();

    println!("Phase 4: RETUNE share=0.5, kFront=8 while rolled 15° (4s)");
    let before = controller.positions();
    match channel.submit_form("share=0.5&kFront=8") {
        Ok(params) => println!(
            "  Accepted: half range now {:.1}°",
            params.suspension_half_range()
        ),
        Err(e) => println!("  ⚠️  Update rejected: {}", e),
    }
    run_phase(&mut controller, &channel, &mut servos, &mut noise, (15.0, 0.0), 4.0);
    check_settled(&controller, 1.0);
    println!(
        "    FR moved {:.1}° → {:.1}° without a jump",
        before[Corner::FrontRight],
        controller.positions()[Corner::FrontRight]
    );
    println!();

    println!("Phase 5: LEVEL (3s)");
    run_phase(&mut controller, &channel, &mut servos, &mut noise, (0.0, 0.0), 3.0);
    check_settled(&controller, 1.0);

    let telemetry = channel.telemetry();
    println!("\n=== Simulation Complete ===");
    println!("\nSummary:");
    println!("- Ticks run: {}", telemetry.tick);
    println!(
        "- Last servo commands: {:?}",
        servos.commands.as_array()
    );
    println!("- Telemetry JSON: {}", telemetry.to_json());
}
