use std::fs::File;
use std::io;
use std::ops::Deref;

/// The bytes of a trace file, memory mapped where the platform allows it
pub enum TraceBuffer {
    #[cfg(unix)]
    Mapped(memmap2::Mmap),
    Owned(Vec<u8>),
}

impl Deref for TraceBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            #[cfg(unix)]
            TraceBuffer::Mapped(m) => m,
            TraceBuffer::Owned(v) => v,
        }
    }
}

pub fn load_trace(file: File) -> io::Result<TraceBuffer> {
    // Compatibility on other systems
    #[cfg(not(unix))]
    {
        use std::io::Read;
        let mut file = file;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;
        Ok(TraceBuffer::Owned(buf))
    }
    // Memory map the file for speed on unix systems, the simulator reads it strictly in order
    #[cfg(unix)]
    {
        use memmap2::{Advice, Mmap};
        // Empty files can't be mapped
        if file.metadata()?.len() == 0 {
            return Ok(TraceBuffer::Owned(Vec::new()));
        }
        // SAFETY: the mapping is read only, and traces aren't modified while being simulated
        let m = unsafe { Mmap::map(&file)? };
        m.advise(Advice::Sequential)?;
        Ok(TraceBuffer::Mapped(m))
    }
}
