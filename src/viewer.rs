use pursuit_evasion::{config::ConfigWatcher, strategy, Simulation};
use rapier2d::math::{Point, Real};
use raylib::prelude::*;

const TARGET_COLOR: Color = Color::GREEN;
const PURSUER_COLOR: Color = Color::RED;
const TEXT_COLOR: Color = Color::WHITE;
const HIGHLIGHT_COLOR: Color = Color::YELLOW;
const FONT_SIZE: i32 = 16;

/// Runs the windowed simulation until the window closes.
pub fn run(sim: &mut Simulation, watcher: Option<ConfigWatcher>) {
    let config = sim.config().clone();
    let (mut rl, thread) = raylib::init()
        .log_level(raylib::consts::TraceLogLevel::LOG_WARNING)
        .size(config.arena.width as i32, config.arena.height as i32)
        .title("Pursuit and Evasion")
        .vsync()
        .build();
    rl.set_target_fps(config.target_fps);
    let mut rotate_sprites = config.rotate_sprites;

    while !rl.window_should_close() {
        if let Some(config) = watcher.as_ref().and_then(ConfigWatcher::take_update) {
            rl.set_target_fps(config.target_fps);
            rl.set_window_size(config.arena.width as i32, config.arena.height as i32);
            rotate_sprites = config.rotate_sprites;
            sim.reconfigure(config);
        }

        use raylib::consts::KeyboardKey::*;
        if rl.is_key_pressed(KEY_R) {
            sim.reset_complete();
        }
        if rl.is_key_pressed(KEY_SPACE) {
            sim.toggle_pause();
        }
        for (key, index) in [(KEY_ONE, 0), (KEY_TWO, 1), (KEY_THREE, 2)] {
            if rl.is_key_pressed(key) {
                sim.select_strategy(index);
            }
        }
        if rl.is_key_pressed(KEY_T) {
            rotate_sprites = !rotate_sprites;
        }

        sim.tick();

        let mut d = rl.begin_drawing(&thread);
        d.clear_background(Color::BLACK);
        let mut render = Render {
            d: &mut d,
            rotate_sprites,
        };

        let target = sim.target();
        render.draw_agent(target.position(), target.size(), target.angle(), TARGET_COLOR);
        let pursuer = sim.pursuer();
        render.draw_agent(pursuer.position(), pursuer.size(), pursuer.angle(), PURSUER_COLOR);
        if pursuer.target_detected() {
            render.draw_detection_ring(pursuer.position(), pursuer.size());
        }
        render.draw_info(sim);
        if sim.is_captured() {
            let frames_left = sim
                .config()
                .capture_display_frames
                .saturating_sub(sim.capture_display_time());
            render.draw_capture_banner(
                sim.config().arena.width,
                sim.config().arena.height,
                frames_left,
            );
        }
    }
}

struct Render<'a, 'b> {
    d: &'a mut RaylibDrawHandle<'b>,
    rotate_sprites: bool,
}

impl Render<'_, '_> {
    /// Square stand-in for the agent's sprite, turned to its heading when rotation is on.
    fn draw_agent(&mut self, position: Point<Real>, size: Real, angle: Real, color: Color) {
        if self.rotate_sprites {
            self.d.draw_rectangle_pro(
                Rectangle::new(position.x, position.y, size, size),
                Vector2::new(size / 2.0, size / 2.0),
                -angle,
                color,
            );
        } else {
            self.d.draw_rectangle_v(
                Vector2::new(position.x - size / 2.0, position.y - size / 2.0),
                Vector2::new(size, size),
                color,
            );
        }
    }

    fn draw_detection_ring(&mut self, position: Point<Real>, size: Real) {
        self.d.draw_circle_lines(
            position.x as i32,
            position.y as i32,
            size + 5.0,
            HIGHLIGHT_COLOR,
        );
    }

    fn draw_info(&mut self, sim: &Simulation) {
        let scores = sim.scores();
        let strategy = format!(
            "STRATEGY: {}",
            strategy::display_name(sim.strategy_id()).to_uppercase()
        );
        self.d.draw_text(&strategy, 10, 10, FONT_SIZE, HIGHLIGHT_COLOR);
        if sim.is_paused() {
            self.d.draw_text("PAUSED", 600, 10, FONT_SIZE, HIGHLIGHT_COLOR);
        }

        let detected = if sim.pursuer().target_detected() { "YES" } else { "NO" };
        let lines = [
            format!("Frames: {}", sim.frame_count()),
            format!("Captures: {}", sim.capture_count()),
            format!("Average capture time: {:.1} frames", sim.average_capture_time()),
            format!(
                "Detection - Precision: {:.2}, Recall: {:.2}, F1: {:.2}",
                scores.precision, scores.recall, scores.f1
            ),
            format!("Target detected: {}", detected),
            format!("Target speed: {:.1}", sim.target().speed()),
            format!("Pursuer speed: {:.1}", sim.pursuer().speed()),
            String::new(),
            "Controls:".to_string(),
            "R - Full reset".to_string(),
            "SPACE - Pause".to_string(),
            "1 - Direct Pursuit".to_string(),
            "2 - Predictive Intercept".to_string(),
            "3 - Proportional Navigation".to_string(),
            "T - Toggle sprite rotation".to_string(),
        ];
        for (i, line) in lines.iter().enumerate() {
            self.d
                .draw_text(line, 10, 30 + i as i32 * 20, FONT_SIZE, TEXT_COLOR);
        }
    }

    fn draw_capture_banner(&mut self, width: Real, height: Real, frames_left: u32) {
        let (w, h) = (width as i32, height as i32);
        self.d
            .draw_rectangle(0, (h - 100) / 2, w, 100, Color::BLACK.alpha(0.5));
        self.d
            .draw_text("CAPTURED!", w / 2 - 120, h / 2 - 44, 48, HIGHLIGHT_COLOR);
        self.d.draw_text(
            &format!("Restarting in {} frames...", frames_left),
            w / 2 - 150,
            h / 2 + 18,
            24,
            Color::LIGHTGRAY,
        );
    }
}
