use core::cell::RefCell;
use core::convert::Infallible;
use std::rc::Rc;
use std::vec::Vec;

use beamscan::ad5664::{Ad5664, Address};
use beamscan::convert::{AdcCode, DacCode};
use beamscan::hardware::{DacOutput, SampleTrigger, TickSource};
use beamscan::command::Command;
use beamscan::settings::{Frequencies, Settings};
use beamscan::{Axis, ScanController, SharedScan, State};
use embedded_hal::spi::{ErrorType, Operation, SpiDevice};
use fugit::{HertzU32, MicrosDurationU32};

/// DAC channel outputs as last written.
#[derive(Default)]
struct Outputs {
    codes: [u16; 4],
    writes: usize,
}

impl DacOutput for Outputs {
    type Error = Infallible;

    fn emit(
        &mut self,
        channel: Address,
        code: DacCode,
    ) -> Result<(), Infallible> {
        let index = match channel {
            Address::A => 0,
            Address::B => 1,
            Address::C => 2,
            Address::D => 3,
            _ => unreachable!(),
        };
        self.codes[index] = code.0;
        self.writes += 1;
        Ok(())
    }
}

#[derive(Default)]
struct Pacer {
    interval: Option<MicrosDurationU32>,
    rate: Option<HertzU32>,
}

impl TickSource for Pacer {
    fn start(&mut self, interval: MicrosDurationU32) {
        self.interval = Some(interval);
    }

    fn stop(&mut self) {
        self.interval = None;
    }
}

impl SampleTrigger for Pacer {
    fn arm(&mut self, rate: HertzU32) {
        self.rate = Some(rate);
    }

    fn disarm(&mut self) {
        self.rate = None;
    }
}

type Controller = ScanController<Outputs, Pacer, Pacer>;

fn controller() -> Controller {
    ScanController::new(
        &Settings::default(),
        Outputs::default(),
        Pacer::default(),
        Pacer::default(),
        (),
    )
    .unwrap()
}

#[test]
fn full_raster_scan() {
    let settings = Settings {
        frequencies: Frequencies {
            fast_scan: 20.0,
            slow_scan: 0.5,
            fast_beam: 8.0,
            slow_beam: 0.25,
            sample_rate: 5_000.0,
        },
        ..Default::default()
    };
    let mut scan = ScanController::new(
        &settings,
        Outputs::default(),
        Pacer::default(),
        Pacer::default(),
        (),
    )
    .unwrap();

    let reply = scan.execute("s 60, 1, 60, 1, 20000".parse().unwrap());
    assert_eq!(reply, Ok(None));
    assert_eq!(scan.frequencies(), &Frequencies::default());
    scan.execute(Command::Run).unwrap();
    assert_eq!(scan.timer().interval, Some(MicrosDurationU32::micros(50)));
    assert_eq!(scan.trigger().rate, Some(HertzU32::Hz(20_000)));

    let mut ticks = 0u32;
    let mut slow_peak = 0u16;
    while scan.state() == State::Scanning {
        scan.on_tick();
        slow_peak = slow_peak.max(scan.dac().codes[1]);
        ticks += 1;
        assert!(ticks <= 20_001);
    }
    assert!(ticks >= 19_999);

    // The slow axis swept the full range once.
    assert!(slow_peak > 65_000);
    // The fast axis was restarted once per fast period.
    let deadline = scan.waveforms()[Axis::SlowScan].sync_deadline().unwrap();
    let restarts = (deadline * 60.0).round() as u32;
    assert!((60..=61).contains(&restarts));

    assert_eq!(scan.position(Axis::FastScan), 0.0);
    assert_eq!(scan.position(Axis::SlowScan), 0.0);
    assert_eq!(&scan.dac().codes[..2], &[0, 0]);
    assert_eq!(scan.timer().interval, None);
    assert_eq!(scan.trigger().rate, None);
    assert!(!scan.calibration_finished());
}

#[test]
fn calibration_parks_at_peak() {
    let mut scan = controller();
    scan.cal();

    let samples = [1u16, 5, 9, 4, 2];
    let mut at_peak = None;
    let mut ticks = 0u32;
    while scan.state() == State::Calibrating {
        scan.on_tick();
        ticks += 1;
        if ticks % 3_000 == 0 {
            let index = (ticks / 3_000 - 1) as usize;
            if let Some(&sample) = samples.get(index) {
                scan.on_sample(AdcCode(sample));
                if sample == 9 {
                    at_peak = Some([
                        scan.position(Axis::FastBeam),
                        scan.position(Axis::SlowBeam),
                    ]);
                }
            }
        }
    }

    let at_peak = at_peak.unwrap();
    assert_eq!(scan.state(), State::Quiet);
    assert!(scan.calibration_finished());
    assert_eq!(scan.sample_max(), AdcCode(9));
    assert_eq!(scan.max_positions(), at_peak);
    assert_eq!(scan.position(Axis::FastBeam), at_peak[0]);
    assert_eq!(scan.position(Axis::SlowBeam), at_peak[1]);
    assert_eq!(scan.dac().codes[2], DacCode::from(at_peak[0]).0);
    assert_eq!(scan.dac().codes[3], DacCode::from(at_peak[1]).0);

    let status = scan.execute(Command::Status).unwrap();
    let report = status.unwrap().calibration.unwrap();
    assert_eq!(report.x, at_peak[0] * 3.3);
    assert!(!scan.calibration_finished());
}

#[test]
fn interrupt_handles() {
    static SCAN: SharedScan<Controller> = SharedScan::new();

    assert!(SCAN.init(controller()).is_ok());
    SCAN.lock(|scan| scan.cal());
    for sample in 0..100u16 {
        SCAN.on_tick();
        SCAN.on_sample(AdcCode(sample));
    }
    assert_eq!(SCAN.missed_ticks(), 0);
    assert_eq!(SCAN.missed_samples(), 0);
    assert_eq!(SCAN.lock(|scan| scan.sample_max()), Some(AdcCode(99)));

    SCAN.lock(|scan| scan.stop());
    let writes = SCAN.lock(|scan| scan.dac().writes).unwrap();
    SCAN.on_tick();
    assert_eq!(SCAN.lock(|scan| scan.dac().writes), Some(writes));
}

#[test]
fn sample_stream() {
    let mut queue = heapless::spsc::Queue::<AdcCode, 4>::new();
    let (producer, mut consumer) = queue.split();
    let mut scan = ScanController::new(
        &Settings::default(),
        Outputs::default(),
        Pacer::default(),
        Pacer::default(),
        producer,
    )
    .unwrap();

    scan.run();
    for sample in 1..=5u8 {
        scan.on_tick();
        scan.on_sample(sample.into());
    }
    assert_eq!(scan.status().dropped_samples, 2);
    let streamed: Vec<_> = core::iter::from_fn(|| consumer.dequeue()).collect();
    assert_eq!(streamed, [AdcCode(1), AdcCode(2), AdcCode(3)]);
}

/// Records the SPI frames written to the bus.
#[derive(Clone, Default)]
struct Bus(Rc<RefCell<Vec<Vec<u8>>>>);

impl ErrorType for Bus {
    type Error = Infallible;
}

impl SpiDevice<u8> for Bus {
    fn transaction(
        &mut self,
        operations: &mut [Operation<'_, u8>],
    ) -> Result<(), Infallible> {
        for operation in operations {
            if let Operation::Write(data) = operation {
                self.0.borrow_mut().push(data.to_vec());
            }
        }
        Ok(())
    }
}

#[test]
fn ad5664_frames() {
    let bus = Bus::default();
    let mut scan = ScanController::new(
        &Settings::default(),
        Ad5664::new(bus.clone()),
        Pacer::default(),
        Pacer::default(),
        (),
    )
    .unwrap();

    // Construction zeroes the four channels with write-and-update frames.
    assert_eq!(
        *bus.0.borrow(),
        [
            [0x18, 0, 0],
            [0x19, 0, 0],
            [0x1a, 0, 0],
            [0x1b, 0, 0],
        ]
    );

    scan.run();
    scan.on_tick();
    let frames = bus.0.borrow();
    assert_eq!(frames.len(), 6);
    assert_eq!(frames[4][0], 0x18);
    assert_eq!(frames[5][0], 0x19);
    let code = u16::from_be_bytes([frames[5][1], frames[5][2]]);
    assert_eq!(code, scan.waveforms()[Axis::SlowScan].code().0);
}
