//! Runs the arm's command protocol against simulated hardware.
//!
//! Reads command lines from stdin and prints each response, e.g.
//! `echo 'MOVE>J1_200;J2_-100;' | cargo run --features std --bin robert-sim`.
//! Limit switches never close, so `CALIBRATE` runs into its timeout.

use std::io::{self, BufRead, Write};
use std::process;
use std::task::Poll;

use log::{error, info};
use robert_arm::config::DEFAULT_JOINTS;
use robert_arm::sim::{sim_robot, SimPinBank, SimSerial};
use robert_arm::SerialLink;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut robot = match sim_robot(&DEFAULT_JOINTS, SimPinBank::new(), None) {
        Ok(robot) => robot,
        Err(err) => {
            error!("invalid joint wiring: {:?}", err);
            process::exit(1);
        }
    };
    robot.start();

    let mut link: SerialLink<SimSerial> = SerialLink::new(SimSerial::new());
    let stdout = io::stdout();
    let mut stdout = stdout.lock();

    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                error!("stdin: {}", err);
                process::exit(1);
            }
        };
        link.serial_mut().push_input(line.as_bytes());
        link.serial_mut().push_input(b"\n");

        loop {
            match link.serve(&mut robot) {
                Poll::Pending => break,
                Poll::Ready(Ok(())) => {}
                Poll::Ready(Err(err)) => {
                    error!("serial: {:?}", err);
                    process::exit(1);
                }
            }
        }

        let output = link.serial_mut().take_output();
        if stdout.write_all(output.as_bytes()).and_then(|_| stdout.flush()).is_err() {
            break;
        }
    }

    info!("input closed, shutting down");
}
