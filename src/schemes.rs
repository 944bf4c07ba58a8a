// Built-in color data: the 19-shade ramps and the library schemes
//
// Library schemes are stored as concatenated 6-digit hex strings.

/// Number of shades in every custom ramp (50 to 950).
pub const RAMP_SHADES: usize = 19;

pub const AMBRE: [&str; RAMP_SHADES] = [
    "#F9EFE8", "#F2DFD1", "#EBD0BA", "#E4C0A4", "#DCB18E", "#D3A279", "#CA9364", "#C1844F",
    "#B7763A", "#AD6724", "#A25907", "#984B00", "#844200", "#713900", "#5E3000", "#4C2802",
    "#3A2003", "#2A1803", "#1A0F01",
];

pub const BOUTEILLE: [&str; RAMP_SHADES] = [
    "#EDF3E8", "#DCE6D2", "#CADABC", "#B9CEA6", "#A7C291", "#96B67C", "#85AA67", "#739F52",
    "#61933D", "#4F8726", "#3B7C06", "#257000", "#236200", "#215400", "#1E4601", "#1B3904",
    "#182C05", "#141F05", "#0C1402",
];

pub const CANARD: [&str; RAMP_SHADES] = [
    "#E5F4F2", "#CBE9E6", "#B1DEDA", "#96D3CE", "#79C8C2", "#59BDB6", "#2EB2AA", "#00A79F",
    "#009B93", "#009088", "#00847D", "#007872", "#006963", "#005A55", "#004B47", "#003D39",
    "#002F2C", "#002220", "#001513",
];

pub const PETROLE: [&str; RAMP_SHADES] = [
    "#ECF1F4", "#DAE3E9", "#C8D6DF", "#B6C8D4", "#A3BBC9", "#91AEBF", "#7FA1B5", "#6D94AA",
    "#5B88A0", "#477B96", "#326F8C", "#2E627B", "#2A566B", "#26495B", "#223E4C", "#1D323D",
    "#18272F", "#131C21", "#0C1114",
];

pub const OUTREMER: [&str; RAMP_SHADES] = [
    "#F1F0FB", "#E3E1F7", "#D4D3F2", "#C6C4EE", "#B8B6EA", "#A9A8E5", "#9A9AE1", "#8B8DDC",
    "#7B7FD7", "#6B72D2", "#5966CE", "#4559C9", "#3E4EAD", "#374392", "#303878", "#292E60",
    "#212448", "#1A1A31", "#11101C",
];

pub const AMETHYSTE: [&str; RAMP_SHADES] = [
    "#F7EEF7", "#F0DDEF", "#E8CDE8", "#E0BCE0", "#D8ACD8", "#CF9CD0", "#C78BC8", "#BE7BC0",
    "#B56BB9", "#AC5AB1", "#A348A9", "#9A35A1", "#85308B", "#712B76", "#5E2662", "#4C214E",
    "#3A1B3B", "#281529", "#190D18",
];

pub const FUSCHIA: [&str; RAMP_SHADES] = [
    "#FCEDF1", "#F8DCE3", "#F3CAD6", "#EFB9C8", "#E9A7BB", "#E496AE", "#DE84A1", "#D77294",
    "#D05F88", "#C94B7C", "#C23370", "#BA0F64", "#A11557", "#88184B", "#71193E", "#5A1833",
    "#441627", "#30121D", "#1D0C11",
];

/// Custom ramps by name, shades ordered light to dark.
pub const RAMPS: [(&str, [&str; RAMP_SHADES]); 7] = [
    ("ambre", AMBRE),
    ("bouteille", BOUTEILLE),
    ("canard", CANARD),
    ("petrole", PETROLE),
    ("outremer", OUTREMER),
    ("amethyste", AMETHYSTE),
    ("fuschia", FUSCHIA),
];

/// Named diverging pairs: (name, negative-side ramp, positive-side ramp).
pub const DIVERGING_PAIRS: [(&str, &str, &str); 10] = [
    ("fuschia-canard", "fuschia", "canard"),
    ("canard-fuschia", "canard", "fuschia"),
    ("ambre-outremer", "ambre", "outremer"),
    ("outremer-ambre", "outremer", "ambre"),
    ("amethyste-bouteille", "amethyste", "bouteille"),
    ("bouteille-amethyste", "bouteille", "amethyste"),
    ("petrole-ambre", "petrole", "ambre"),
    ("ambre-petrole", "ambre", "petrole"),
    ("outremer-fuschia", "outremer", "fuschia"),
    ("fuschia-outremer", "fuschia", "outremer"),
];

/// ColorBrewer 9-class sequential schemes.
pub const SEQUENTIAL_9: [(&str, &str); 18] = [
    ("blues", "f7fbffdeebf7c6dbef9ecae16baed64292c62171b508519c08306b"),
    ("greens", "f7fcf5e5f5e0c7e9c0a1d99b74c47641ab5d238b45006d2c00441b"),
    ("reds", "fff5f0fee0d2fcbba1fc9272fb6a4aef3b2ccb181da50f1567000d"),
    ("oranges", "fff5ebfee6cefdd0a2fdae6bfd8d3cf16913d94801a636037f2704"),
    ("purples", "fcfbfdefedf5dadaebbcbddc9e9ac8807dba6a51a354278f3f007d"),
    ("greys", "fffffff0f0f0d9d9d9bdbdbd969696737373525252252525000000"),
    ("bugn", "f7fcfde5f5f9ccece699d8c966c2a441ae76238b45006d2c00441b"),
    ("bupu", "f7fcfde0ecf4bfd3e69ebcda8c96c68c6bb188419d810f7c4d004b"),
    ("gnbu", "f7fcf0e0f3dbccebc5a8ddb57bccc44eb3d32b8cbe0868ac084081"),
    ("orrd", "fff7ecfee8c8fdd49efdbb84fc8d59ef6548d7301fb300007f0000"),
    ("pubu", "fff7fbece7f2d0d1e6a6bddb74a9cf3690c00570b0045a8d023858"),
    ("pubugn", "fff7fbece2f0d0d1e6a6bddb67a9cf3690c002818a016c59014636"),
    ("purd", "f7f4f9e7e1efd4b9dac994c7df65b0e7298ace125698004367001f"),
    ("rdpu", "fff7f3fde0ddfcc5c0fa9fb5f768a1dd3497ae017e7a017749006a"),
    ("ylgn", "ffffe5f7fcb9d9f0a3addd8e78c67941ab5d238443006837004529"),
    ("ylgnbu", "ffffd9edf8b1c7e9b47fcdbb41b6c41d91c0225ea8253494081d58"),
    ("ylorbr", "ffffe5fff7bcfee391fec44ffe9929ec7014cc4c02993404662506"),
    ("ylorrd", "ffffccffeda0fed976feb24cfd8d3cfc4e2ae31a1cbd0026800026"),
];

/// ColorBrewer 11-class diverging schemes.
pub const DIVERGING_11: [(&str, &str); 8] = [
    ("brbg", "5430058c510abf812ddfc27df6e8c3f5f5f5c7eae580cdc135978f01665e003c30"),
    ("piyg", "8e0152c51b7dde77aef1b6dafde0eff7f7f7e6f5d0b8e1867fbc414d9221276419"),
    ("prgn", "40004b762a839970abc2a5cfe7d4e8f7f7f7d9f0d3a6dba05aae611b783700441b"),
    ("rdbu", "67001fb2182bd6604df4a582fddbc7f7f7f7d1e5f092c5de4393c32166ac053061"),
    ("rdgy", "67001fb2182bd6604df4a582fddbc7ffffffe0e0e0bababa8787874d4d4d1a1a1a"),
    ("rdylbu", "a50026d73027f46d43fdae61fee090ffffbfe0f3f8abd9e974add14575b4313695"),
    ("rdylgn", "a50026d73027f46d43fdae61fee08bffffbfd9ef8ba6d96a66bd631a9850006837"),
    ("spectral", "9e0142d53e4ff46d43fdae61fee08bffffbfe6f598abdda466c2a53288bd5e4fa2"),
];

/// Perceptual interpolators, stored as evenly spaced stops.
pub const INTERPOLATORS: [(&str, &str); 5] = [
    (
        "viridis",
        concat!(
            "440154470e61481a6c482575472f7d443a834144873d4e8a39568c35608d31688e2d708e",
            "2a788e27818e23888e21918d1f988b1fa08822a8842ab07f35b77943bf7154c56866cc5d",
            "7ad1518fd744a5db36bcdf27d2e21be9e51afde725"
        ),
    ),
    (
        "magma",
        concat!(
            "0000040404130b0924150e3720114b2c11603b0f704a107957157e651a80721f817f24",
            "828c29819a2e80a8327db6377ac43c75d1426fde4968e95462f1605df76f5cfa7f5efc",
            "8f65fe9f6dfeaf78febf84fece91fddea0fcedaffcfdbf"
        ),
    ),
    (
        "plasma",
        concat!(
            "0d088723069033059742039d5002a25d01a66a00a87801a88405a7900da49c179ea721",
            "98b12a90ba3488c33d80cb4779d35171da5a69e16462e76e5bed7953f2834cf68f44fa",
            "9a3dfca636fdb32ffec029fcce25f9dc24f5ea27f0f921"
        ),
    ),
    (
        "inferno",
        concat!(
            "0000040403130c0826170c3b240c4f330a5f420a68500d6c5d126e6b176e781c6d86",
            "216b932667a12b62ae305cbb3755c73e4cd24644dd513ae65c30ed6925f3771af8850f",
            "fb9506fca50afcb519fac62df6d645f2e661f3f484fcffa4"
        ),
    ),
    (
        "cividis",
        concat!(
            "00205100235800265d002961012b65042e670831690d346b11366c16396d1c3c6e213f6e",
            "26426e2c456e31476e374a6e3c4d6e42506e47536d4c566d51586e555b6e5a5e6e5e616e",
            "62646f66676f6a6a706e6d717270717573727976737c79747f7c75827f75868276898577",
            "8c8877908b78938e789691789a94789e9778a19b78a59e77a9a177aea575b2a874b6ab73",
            "bbaf71c0b26fc5b66dc9b96acebd68d3c065d8c462ddc85fe2cb5ce7cf58ebd355f0d652",
            "f3da4ff7de4cfae249fce647"
        ),
    ),
];

/// Split a concatenated hex string into `#rrggbb` colors.
pub fn decode_hex_list(hex: &str) -> Vec<String> {
    hex.as_bytes()
        .chunks_exact(6)
        .filter_map(|chunk| std::str::from_utf8(chunk).ok())
        .map(|color| format!("#{color}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;

    #[test]
    fn test_every_ramp_parses() {
        for (name, shades) in RAMPS {
            for shade in shades {
                assert!(Rgb::parse_hex(shade).is_some(), "{name}: bad shade {shade}");
            }
        }
    }

    #[test]
    fn test_pairs_reference_known_ramps() {
        for (pair, neg, pos) in DIVERGING_PAIRS {
            assert!(RAMPS.iter().any(|(n, _)| *n == neg), "{pair}");
            assert!(RAMPS.iter().any(|(n, _)| *n == pos), "{pair}");
        }
    }

    #[test]
    fn test_library_scheme_lengths() {
        for (name, hex) in SEQUENTIAL_9 {
            assert_eq!(decode_hex_list(hex).len(), 9, "{name}");
        }
        for (name, hex) in DIVERGING_11 {
            assert_eq!(decode_hex_list(hex).len(), 11, "{name}");
        }
        for (name, hex) in INTERPOLATORS {
            assert_eq!(hex.len() % 6, 0, "{name}");
        }
    }

    #[test]
    fn test_decode_hex_list() {
        assert_eq!(decode_hex_list("ff000000ff00"), vec!["#ff0000", "#00ff00"]);
    }
}
