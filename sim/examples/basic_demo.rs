//! Basic demonstration of the RTS simulation.
//!
//! Run with: RUST_LOG=debug cargo run --example basic_demo

use rts_sim::{Command, SimConfig, SimWorld, TeamId, UnitId, UnitKind};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("=== RTS Simulation Demo ===\n");

    let config = SimConfig {
        fixed_timestep: 0.05,
        ..SimConfig::default()
    };
    let mut sim = SimWorld::initialize(config)?;

    // Team 0 villagers on the west, team 1 warriors on the east
    let mut villagers = Vec::new();
    let mut warriors = Vec::new();
    for i in 0..4 {
        let z = 20.0 + i as f32 * 3.0;
        villagers.push(sim.spawn_unit(UnitKind::Villager, TeamId(0), 10.0, z)?);
        warriors.push(sim.spawn_unit(UnitKind::Warrior, TeamId(1), 30.0, z)?);
    }

    println!("Initial state:");
    print_snapshot(&sim);

    println!("\n--- Villagers walk to the centre, warriors attack them ---\n");
    sim.submit_command(&Command::walk_to(villagers.clone(), 20.0, 25.0))?;
    for (warrior, villager) in warriors.iter().zip(&villagers) {
        sim.submit_command(&Command::attack(vec![*warrior], *villager))?;
    }
    let report = sim.submit_command(&Command::walk_to(vec![UnitId(999)], 0.0, 0.0))?;
    println!("Unknown ids reported: {:?}\n", report.unknown);

    // 20 seconds at 20 ticks/sec
    for frame in 0..400 {
        sim.step(0.05);
        if (frame + 1) % 50 == 0 {
            println!("--- Tick {} (t={:.1}s) ---", sim.current_tick(), sim.current_time());
            print_snapshot(&sim);
        }
    }

    println!("\n=== Final State (JSON) ===\n");
    println!("{}", sim.snapshot().to_json_pretty()?);
    Ok(())
}

fn print_snapshot(sim: &SimWorld) {
    let snapshot = sim.snapshot();
    for team in [TeamId(0), TeamId(1)] {
        println!("  Team {}:", team.0);
        for (id, unit) in snapshot.units.iter().filter(|(_, u)| u.team == team) {
            println!(
                "    {:?} {}: pos=({:.1}, {:.2}, {:.1}) yaw={:.0} hp={:.0}/{:.0} [{:?}]",
                unit.kind,
                id.0,
                unit.x,
                unit.y,
                unit.z,
                unit.orientation,
                unit.health,
                unit.health_max,
                unit.stance
            );
        }
    }
}
