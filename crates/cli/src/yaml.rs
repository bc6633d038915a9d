//! The format-neutral processor description, extended with the ISA
//! mnemonic table, as it is actually found on disk: YAML.
//!
//! Structural shaping only; `serde_yaml` does the parsing, and all
//! semantic validation happens once these raw values reach
//! [`procsim_core::loader`].

use std::collections::HashMap;

use serde::Deserialize;

use procsim_core::loader::RawProcessorDesc;

/// The full hardware description document: a processor microarchitecture
/// plus the mnemonic-to-capability table used to compile a program.
#[derive(Debug, Clone, Deserialize)]
pub struct RawHardwareDesc {
    /// The processor's units and data path.
    pub microarch: RawProcessorDesc,
    /// Mnemonic to capability name, case as written in the file.
    #[serde(rename = "ISA")]
    pub isa: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::RawHardwareDesc;

    #[test]
    fn parses_minimal_hardware_description() {
        let yaml = "
microarch:
  units:
    - name: fullSys
      width: 1
      capabilities: [ALU]
      readLock: true
      writeLock: true
  dataPath: []
ISA:
  ADD: ALU
";
        let desc: RawHardwareDesc = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(desc.microarch.units.len(), 1);
        assert_eq!(desc.isa.get("ADD"), Some(&"ALU".to_string()));
    }
}
