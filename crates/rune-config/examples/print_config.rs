/// Print the motion configuration after file and environment overrides.
///
/// Run with: cargo run -p rune-config --example print_config

fn main() {
    let config = rune_config::RuneConfig::load();
    let motion = &config.motion;

    println!("=== Rune Motion Configuration ===\n");

    println!("Playback:");
    println!("  Fallback Padding: {} ms", motion.fallback_padding_ms);
    println!("  Keyframe Anchor Limit: {}", motion.keyframe_anchor_limit);
    println!("  Frame Interval: {} ms", motion.frame_interval_ms);
    println!("  Default Easing: {}", motion.default_easing);
    println!();

    println!("Transitions:");
    println!("  Cancel Superseded Hover: {}", motion.cancel_superseded_hover);
    println!("  Max Listen Cascade: {}", motion.max_listen_cascade);
    println!();

    println!("Performance Penalties:");
    println!("  Layout: {}", motion.performance.layout_penalty);
    println!("  Paint: {}", motion.performance.paint_penalty);
    println!();

    match toml::to_string_pretty(&config) {
        Ok(toml_str) => {
            println!("=== Serialized Configuration ===");
            println!("{}", toml_str);
        }
        Err(e) => {
            eprintln!("Failed to serialize config: {}", e);
        }
    }
}
