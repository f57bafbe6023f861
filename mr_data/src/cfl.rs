use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use byteorder::{ByteOrder, LittleEndian};
use ndarray::{Array2, Array4};
use num_complex::Complex64;
use spin_sim::Signal;
use tracing::debug;
use crate::error::{io_err, DataError, Result};

/// BART dimension slots used for simulator output
const READ_DIM:usize = 0;
const PHASE_DIM:usize = 1;
const COIL_DIM:usize = 3;
const N_HDR_DIMS:usize = 5;

pub fn load_cfl_header(cfl_base:&Path) -> Result<HashMap<String,String>> {
    let (hdr,_) = cfl_base_decode(cfl_base);
    let mut f = File::open(&hdr).map_err(io_err(&hdr))?;
    let mut s = String::new();
    f.read_to_string(&mut s).map_err(io_err(&hdr))?;
    let mut h = HashMap::<String,String>::new();
    let lines:Vec<&str> = s.lines().collect();
    for (i,line) in lines.iter().enumerate() {
        if line.starts_with('#') {
            let value = lines.get(i+1).map(|l| l.to_string()).unwrap_or_default();
            h.insert(line.to_string(),value);
        }
    }
    Ok(h)
}

/// All header dimensions, singletons included
pub fn get_dims(cfl_base:&Path) -> Result<Vec<usize>> {
    let (hdr,_) = cfl_base_decode(cfl_base);
    let h = load_cfl_header(cfl_base)?;
    let d = h.get("# Dimensions").ok_or_else(|| DataError::Header {
        path:hdr.clone(),
        message:"missing # Dimensions".to_string()
    })?;
    d.split_whitespace().map(|tok| tok.parse::<usize>().map_err(|_| DataError::Header {
        path:hdr.clone(),
        message:format!("cannot parse dimension {:?}",tok)
    })).collect()
}

pub fn load(cfl:&Path) -> Result<Vec<f32>> {
    let mut f = File::open(cfl).map_err(io_err(cfl))?;
    let mut buf = Vec::<u8>::new();
    f.read_to_end(&mut buf).map_err(io_err(cfl))?;
    let mut fbuf:Vec<f32> = vec![0.0;buf.len()/4];
    LittleEndian::read_f32_into(&buf[0..fbuf.len()*4],&mut fbuf);
    Ok(fbuf)
}

pub fn write_data(flat:&[f32],cfl_base:&Path) -> Result<()> {
    let (_,cfl) = cfl_base_decode(cfl_base);
    let mut byte_buff:Vec<u8> = vec![0;flat.len()*4];
    LittleEndian::write_f32_into(flat,&mut byte_buff);
    let mut f = File::create(&cfl).map_err(io_err(&cfl))?;
    f.write_all(&byte_buff).map_err(io_err(&cfl))?;
    Ok(())
}

fn write_cfl_header(dims:&[usize;N_HDR_DIMS],cfl_base:&Path) -> Result<()> {
    let (hdr,_) = cfl_base_decode(cfl_base);
    let mut f = File::create(&hdr).map_err(io_err(&hdr))?;
    let dim_str:Vec<String> = dims.iter().map(|d| d.to_string()).collect();
    let hdr_str = format!("# Dimensions\n{}\n",dim_str.join(" "));
    f.write_all(hdr_str.as_bytes()).map_err(io_err(&hdr))?;
    Ok(())
}

/// Write every event of the signal. Events run along the read dimension,
/// repetitions along phase and coils along the BART coil dimension.
pub fn write_signal(signal:&Signal,cfl_base:&Path) -> Result<()> {
    let (n_coils,n_events,n_reps) = signal.dims();
    let mut dims = [1;N_HDR_DIMS];
    dims[READ_DIM] = n_events;
    dims[PHASE_DIM] = n_reps;
    dims[COIL_DIM] = n_coils;
    // reorder to (coil, rep, event, re/im) so the event index varies fastest after re/im
    let flat:Vec<f32> = signal.data().view().permuted_axes([0,2,1,3]).iter().map(|v| *v as f32).collect();
    write_data(&flat,cfl_base)?;
    write_cfl_header(&dims,cfl_base)?;
    debug!("wrote signal {:?} to {:?}",signal.shape(),cfl_base);
    Ok(())
}

pub fn read_signal(cfl_base:&Path) -> Result<Signal> {
    let (hdr,cfl) = cfl_base_decode(cfl_base);
    let dims = get_dims(cfl_base)?;
    if dims.len() < COIL_DIM+1 || dims.iter().enumerate().any(|(i,d)| *d != 1 && ![READ_DIM,PHASE_DIM,COIL_DIM].contains(&i)) {
        return Err(DataError::Header {
            path:hdr,
            message:format!("dimensions {:?} do not describe a simulator signal",dims)
        });
    }
    let (n_events,n_reps,n_coils) = (dims[READ_DIM],dims[PHASE_DIM],dims[COIL_DIM]);
    let expected = 2*n_events*n_reps*n_coils;
    let flat = load(&cfl)?;
    if flat.len() != expected {
        return Err(DataError::Size{path:cfl,expected,found:flat.len()});
    }
    let flat:Vec<f64> = flat.into_iter().map(f64::from).collect();
    let stored = Array4::from_shape_vec((n_coils,n_reps,n_events,2),flat)
        .map_err(|e| DataError::Header{path:hdr,message:e.to_string()})?;
    let data = stored.permuted_axes([0,2,1,3]).as_standard_layout().to_owned();
    Ok(Signal::from_array(data)?)
}

/// Write ADC samples (adc events, repetitions) as a single coil k-space matrix
pub fn write_kspace(samples:&Array2<Complex64>,cfl_base:&Path) -> Result<()> {
    let (n_read,n_phase) = samples.dim();
    let mut dims = [1;N_HDR_DIMS];
    dims[READ_DIM] = n_read;
    dims[PHASE_DIM] = n_phase;
    let mut flat = Vec::<f32>::with_capacity(2*samples.len());
    samples.t().iter().for_each(|c| {
        flat.push(c.re as f32);
        flat.push(c.im as f32);
    });
    write_data(&flat,cfl_base)?;
    write_cfl_header(&dims,cfl_base)
}

/// Extensions are appended so dots already in the base name survive
pub fn cfl_base_decode(cfl_base:&Path) -> (PathBuf,PathBuf) {
    let name = cfl_base.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    (cfl_base.with_file_name(format!("{}.hdr",name)),cfl_base.with_file_name(format!("{}.cfl",name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch(name:&str) -> PathBuf {
        let dir = std::env::temp_dir().join("mr_data_cfl_tests");
        fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn signal_survives_disk() {
        let base = scratch("signal");
        let mut data = Array4::<f64>::zeros((2,3,4,2));
        data[[1,2,3,0]] = 0.5;
        data[[1,2,3,1]] = -0.25;
        data[[0,1,0,0]] = 2.0;
        let sig = Signal::from_array(data).unwrap();
        write_signal(&sig,&base).unwrap();
        assert_eq!(get_dims(&base).unwrap(),vec![3,4,1,2,1]);
        let back = read_signal(&base).unwrap();
        assert_eq!(back,sig);
    }

    #[test]
    fn event_index_varies_fastest_on_disk() {
        let base = scratch("layout");
        let mut data = Array4::<f64>::zeros((1,3,2,2));
        data[[0,1,0,0]] = 7.0;
        data[[0,0,1,1]] = 9.0;
        write_signal(&Signal::from_array(data).unwrap(),&base).unwrap();
        let raw = load(&cfl_base_decode(&base).1).unwrap();
        assert_eq!(raw.len(),12);
        // sample (event 1, rep 0) real part
        assert_eq!(raw[2],7.0);
        // sample (event 0, rep 1) imaginary part
        assert_eq!(raw[7],9.0);
    }

    #[test]
    fn truncated_data_is_rejected() {
        let base = scratch("truncated");
        write_signal(&Signal::zeros(1,4,4),&base).unwrap();
        write_data(&[0.0;6],&base).unwrap();
        assert!(matches!(read_signal(&base),Err(DataError::Size{expected:32,found:6,..})));
    }

    #[test]
    fn missing_header_is_an_io_error() {
        let base = scratch("does_not_exist");
        assert!(matches!(get_dims(&base),Err(DataError::Io{..})));
    }

    #[test]
    fn dotted_base_names_keep_their_stem() {
        let base = scratch("run.v2");
        write_signal(&Signal::zeros(1,2,3),&base).unwrap();
        let dir = base.parent().unwrap();
        assert!(dir.join("run.v2.cfl").exists());
        assert!(dir.join("run.v2.hdr").exists());
        assert_eq!(read_signal(&base).unwrap().dims(),(1,2,3));

        // a second dotted base in the same directory must not collide with the first
        let other = scratch("run.v3");
        write_signal(&Signal::zeros(2,2,3),&other).unwrap();
        assert_eq!(read_signal(&base).unwrap().dims(),(1,2,3));
        assert_eq!(read_signal(&other).unwrap().dims(),(2,2,3));
    }

    #[test]
    fn kspace_header_has_read_and_phase() {
        let base = scratch("kspace");
        let mut k = Array2::<Complex64>::zeros((5,3));
        k[[4,0]] = Complex64::new(1.0,-1.0);
        write_kspace(&k,&base).unwrap();
        assert_eq!(get_dims(&base).unwrap(),vec![5,3,1,1,1]);
        let raw = load(&cfl_base_decode(&base).1).unwrap();
        assert_eq!(raw[8],1.0);
        assert_eq!(raw[9],-1.0);
    }
}
