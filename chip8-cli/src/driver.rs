//! Headless frame loop.
use std::io::Write;

use chip8::{constants::DELAY_FREQUENCY, prelude::*};

use crate::{error::AppError, render::Render, script::InputScript};

/// Settings for a headless run.
#[derive(Debug, Clone)]
pub struct DriverConf {
    /// Instruction rate.
    pub hz: Hz,
    /// Number of 60Hz frames to run before stopping.
    pub frames: u64,
    /// Characters per display pixel, horizontally and vertically.
    pub scale: usize,
    /// Run frames back to back instead of pacing them in real time.
    pub fast: bool,
}

impl Default for DriverConf {
    fn default() -> Self {
        Self {
            hz: Hz::default(),
            frames: 600,
            scale: 1,
            fast: false,
        }
    }
}

/// Counters reported when a run finishes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub frames: u64,
    pub steps: u64,
    pub faults: u64,
    pub redraws: u64,
}

/// Owns the machine and its inputs, and pushes frames through them.
pub struct Driver {
    vm: Chip8Vm,
    keypad: Keypad,
    script: InputScript,
    render: Render,
    conf: DriverConf,
}

impl Driver {
    pub fn new(vm: Chip8Vm, script: InputScript, conf: DriverConf) -> Self {
        Self {
            vm,
            keypad: Keypad::new(),
            script,
            render: Render::new(conf.scale),
            conf,
        }
    }

    pub fn vm(&self) -> &Chip8Vm {
        &self.vm
    }

    pub fn keypad(&self) -> &Keypad {
        &self.keypad
    }

    /// Instructions executed per 60Hz frame. Never zero.
    pub fn steps_per_frame(&self) -> u64 {
        (self.conf.hz.0 / DELAY_FREQUENCY).max(1)
    }

    /// Run the configured number of frames, writing the screen to `out`
    /// each time the program changes it.
    pub fn run(&mut self, out: &mut impl Write) -> Result<RunStats, AppError> {
        let steps_per_frame = self.steps_per_frame();
        let mut clock = Clock::new(Hz(DELAY_FREQUENCY));
        let mut stats = RunStats::default();

        log::info!(
            "running {} frames at {}Hz ({} steps per frame)",
            self.conf.frames,
            self.conf.hz.0,
            steps_per_frame
        );

        for frame in 0..self.conf.frames {
            self.script.apply(frame, &mut self.keypad);

            for _ in 0..steps_per_frame {
                stats.steps += 1;

                match self.vm.step(&mut self.keypad) {
                    Flow::KeyWait => {
                        // Nothing else can happen until the script presses a key.
                        break;
                    }
                    Flow::Fault(_) => {
                        stats.faults += 1;
                    }
                    Flow::Sound => {
                        log::debug!("frame {frame}: buzzer on");
                    }
                    Flow::Ok | Flow::Jump | Flow::Draw => {}
                }
            }

            self.vm.tick_timers();

            if self.vm.display().needs_redraw() {
                let mut screen = String::new();
                self.render.draw(self.vm.display(), &mut screen)?;
                writeln!(out, "frame {frame}")?;
                out.write_all(screen.as_bytes())?;
                self.vm.acknowledge_redraw();
                stats.redraws += 1;
            }

            stats.frames += 1;

            if !self.conf.fast {
                clock.wait();
            }
        }

        out.flush()?;

        log::info!(
            "finished: {} frames, {} steps, {} faults, {} redraws",
            stats.frames,
            stats.steps,
            stats.faults,
            stats.redraws
        );

        Ok(stats)
    }
}
