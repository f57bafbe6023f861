//! Built-in event programs.
//!
//! Both protocols leave five preparation events ahead of the readout and two
//! spoiling events after it. The excitation sits on event 3 and the
//! prewinder or phase blip on event 4.

use anyhow::bail;
use serde::{Deserialize, Serialize};
use spin_sim::unit::Unit;
use spin_sim::{EventSequence, SequenceClass};

const PREP_EVENTS:usize = 5;
const TAIL_EVENTS:usize = 2;
const EXCITATION_EVENT:usize = 3;
const PREWIND_EVENT:usize = 4;

/// Times are in milliseconds and angles in degrees
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Protocol {
    /// single excitation followed by a free induction decay readout
    Fid {
        n_read:usize,
        flip_deg:f64,
        rf_phase_deg:f64,
        event_time:f64,
    },
    /// single-shot gradient echo EPI with alternating readout polarity
    GreEpi {
        n_read:usize,
        n_phase:usize,
        event_time:f64,
        excitation_time:f64,
        prewind_time:f64,
        flip_deg:f64,
    },
}

impl Protocol {
    pub fn default_fid() -> Self {
        Protocol::Fid {
            n_read:32,
            flip_deg:90.0,
            rf_phase_deg:0.0,
            event_time:0.08,
        }
    }

    pub fn default_gre_epi(n_read:usize,n_phase:usize) -> Self {
        Protocol::GreEpi {
            n_read,
            n_phase,
            event_time:0.08,
            excitation_time:2.0,
            prewind_time:0.3,
            flip_deg:90.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Protocol::Fid{..} => "fid",
            Protocol::GreEpi{..} => "gre_epi",
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let (n_read,times) = match self {
            Protocol::Fid{n_read,event_time,..} => (*n_read,vec![*event_time]),
            Protocol::GreEpi{n_read,n_phase,event_time,excitation_time,prewind_time,..} => {
                if *n_phase == 0 {
                    bail!("gre_epi needs at least one phase encoding line");
                }
                (*n_read,vec![*event_time,*excitation_time,*prewind_time])
            }
        };
        if n_read == 0 {
            bail!("{} needs at least one readout sample",self.name());
        }
        if times.iter().any(|t| !(t.is_finite() && *t > 0.0)) {
            bail!("{} event times must be positive, got {:?} ms",self.name(),times);
        }
        Ok(())
    }

    pub fn n_events(&self) -> usize {
        match self {
            Protocol::Fid{n_read,..} | Protocol::GreEpi{n_read,..} => n_read + PREP_EVENTS + TAIL_EVENTS,
        }
    }

    pub fn build(&self) -> spin_sim::Result<EventSequence> {
        let n_events = self.n_events();
        let adc = (PREP_EVENTS,n_events - TAIL_EVENTS);
        match *self {
            Protocol::Fid{flip_deg,rf_phase_deg,event_time,..} => {
                let mut seq = EventSequence::new(n_events,1,Unit::Millis(event_time).si(),SequenceClass::GreDream)?;
                seq.set_rf(EXCITATION_EVENT,0,Unit::Degrees(flip_deg).si(),Unit::Degrees(rf_phase_deg).si())?;
                seq.set_excitation_event(EXCITATION_EVENT)?;
                seq.set_adc_range(adc.0,adc.1)?;
                Ok(seq)
            }
            Protocol::GreEpi{n_read,n_phase,event_time,excitation_time,prewind_time,flip_deg} => {
                let mut seq = EventSequence::new(n_events,n_phase,Unit::Millis(event_time).si(),SequenceClass::Epi)?;
                seq.set_rf(EXCITATION_EVENT,0,Unit::Degrees(flip_deg).si(),0.0)?;
                seq.set_excitation_event(EXCITATION_EVENT)?;
                seq.set_duration(EXCITATION_EVENT,0,Unit::Millis(excitation_time).si())?;
                seq.set_duration(PREWIND_EVENT,0,Unit::Millis(prewind_time).si())?;
                seq.set_adc_range(adc.0,adc.1)?;
                // phase along x (rows), readout along y (cols)
                seq.set_gradient(PREWIND_EVENT,0,-0.5*n_phase as f64,-0.5*n_read as f64)?;
                for rep in 0..n_phase {
                    let polarity = if rep % 2 == 0 { 1.0 } else { -1.0 };
                    if rep > 0 {
                        // blip to the next line while stepping one sample past the
                        // end of the previous line so the reversed line lands on the same grid
                        seq.set_gradient(PREWIND_EVENT,rep,1.0,-polarity)?;
                    }
                    for e in adc.0..adc.1 {
                        seq.set_gradient(e,rep,0.0,polarity)?;
                    }
                }
                Ok(seq)
            }
        }
    }
}
