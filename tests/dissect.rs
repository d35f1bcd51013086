// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  tests/dissect.rs - End-to-end dissection tests.
 *  Copyright (C) 2026  Forest Crossman <cyrozap@gmail.com>
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  You should have received a copy of the GNU General Public License
 *  along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use dissector::convert::Charset;
use dissector::dissector::{DissectOptions, Dissector};
use dissector::error::{DissectError, LayoutError};
use dissector::input::read_input;
use dissector::layout::{Layout, LayoutSource};

const TRANSACTION_LAYOUT: &str = r#"
<layout type="dsect">
  <field name="RecLen" length="2" type="D"/>
  <field name="RecType" length="1" type="C" values="C1=Account,C2=Transfer"/>
  <field name="Created" length="2" type="PARSD"/>
  <field name="Stamp" length="8" type="TOD"/>
  <field name="Flags" length="1" type="B" values="80=Active,40=Held,01=Audited"/>
  <field name="Entries" length="1" kind="counter" for="entry"/>
  <struc name="entry">
    <field name="Code" length="2" type="C"/>
    <field name="Amount" length="2" type="D"/>
  </struc>
</layout>
"#;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("dissector-test-{}-{}", name, std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn line(label: &str, value: &str) -> String {
    format!("{:>35} : {}\n", label, value)
}

struct MemorySource(HashMap<&'static str, &'static str>);

impl LayoutSource for MemorySource {
    fn load(&self, name: &str) -> Result<Layout, LayoutError> {
        match self.0.get(name) {
            Some(xml) => Layout::from_xml_str(xml),
            None => Err(LayoutError::NotFound(name.to_string())),
        }
    }
}

#[test]
fn test_transaction_record() {
    let layout = Layout::from_xml_str(TRANSACTION_LAYOUT).unwrap();
    let input = [
        "0020",
        "C2",
        "4CC1",
        "D212422300000000",
        "C1",
        "02",
        "C1C1",
        "0064",
        "C2C2",
        "00C8",
    ]
    .concat();

    let dissection = Dissector::new(&layout).dissect(&input);
    assert!(dissection.status.is_ok(), "{}", dissection.report);

    let expected = [
        line("(0.2) RecLen", "0020 = '32'"),
        line("(2.1) RecType", "C2 = 'B' (Transfer)"),
        line("(3.2) Created", "4CC1 = '20-Oct-2019'"),
        line("(5.8) Stamp", "D212422300000000 = '09-Feb-2017 07:22:53'"),
        line("(13.1) Flags", "C1 = '11000001'"),
        format!("{}Active\n", " ".repeat(38)),
        format!("{}Held\n", " ".repeat(38)),
        format!("{}Audited\n", " ".repeat(38)),
        line("(14.1) Entries", "'02'"),
        "entry 1 of 2 :\n".to_string(),
        line("(15.2) Code", "C1C1 = 'AA'"),
        line("(17.2) Amount", "0064 = '100'"),
        "entry 2 of 2 :\n".to_string(),
        line("(19.2) Code", "C2C2 = 'BB'"),
        line("(21.2) Amount", "00C8 = '200'"),
    ]
    .concat();
    assert_eq!(dissection.report, expected);
    assert_eq!(dissection.offset, 23);
}

#[test]
fn test_layout_and_input_from_files() {
    let dir = scratch_dir("files");
    let layout_path = dir.join("record.xml");
    let input_path = dir.join("record.hex");
    fs::write(&layout_path, TRANSACTION_LAYOUT).unwrap();
    fs::write(
        &input_path,
        "0020 C2 4CC1\nD2124223 00000000\nC1 01\nC1C1 0064\n",
    )
    .unwrap();

    let layout = Layout::from_file(&layout_path).unwrap();
    assert_eq!(layout.dir.as_deref(), Some(dir.as_path()));
    let input = read_input(&input_path, layout.mode).unwrap();
    let dissection = Dissector::new(&layout).dissect(&input);

    assert!(dissection.status.is_ok());
    assert!(dissection.report.contains("entry 1 of 1 :\n"));
    assert!(!dissection.report.contains("entry 2"));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_external_filler_layout_from_directory() {
    let dir = scratch_dir("external");
    fs::write(
        dir.join("main.xml"),
        r#"<layout type="raw">
             <field name="Type" length="2"/>
             <field name="Body" kind="filler" for="BODY"/>
           </layout>"#,
    )
    .unwrap();
    fs::write(
        dir.join("BODY.xml"),
        r#"<layout type="raw"><field name="Item" length="3"/></layout>"#,
    )
    .unwrap();

    let layout = Layout::from_file(&dir.join("main.xml")).unwrap();
    let source = layout.sibling_source().unwrap();
    let dissection = Dissector::new(&layout)
        .with_source(&source)
        .dissect("T1abcdef");

    assert!(dissection.status.is_ok(), "{}", dissection.report);
    let expected = [
        line("(0.2) Type", "'T1'"),
        "---BODY [Rest of the data]:\n".to_string(),
        line("(2.3) Item", "'abc'"),
        line("(5.3) Item", "'def'"),
    ]
    .concat();
    assert_eq!(dissection.report, expected);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_external_layout_failure_is_reported() {
    let layout = Layout::from_xml_str(
        r#"<layout type="raw"><field name="Body" kind="filler" for="NOPE"/></layout>"#,
    )
    .unwrap();
    let source = MemorySource(HashMap::new());
    let dissection = Dissector::new(&layout).with_source(&source).dissect("xyz");

    assert_eq!(dissection.code(), -6);
    assert!(
        dissection
            .report
            .contains("Error: 'NOPE' Struc layout not found. layout 'NOPE' not found")
    );
}

#[test]
fn test_tracked_filler_with_external_layout() {
    let layout = Layout::from_xml_str(
        r#"<layout type="dsect">
             <field name="Size" length="1" type="D" useForFiller="y"/>
             <field name="Kind" length="1" type="C"/>
             <field name="Extra" kind="filler" for="EXTRA"/>
             <field name="Trailer" length="1" type="C"/>
           </layout>"#,
    )
    .unwrap();
    let source = MemorySource(HashMap::from([(
        "EXTRA",
        r#"<layout type="dsect"><field name="Pair" length="2" type="C"/></layout>"#,
    )]));

    // Size 5 leaves 4 bytes for the filler after Kind.
    let dissection = Dissector::new(&layout)
        .with_source(&source)
        .dissect("05C1F1F2F3F4C9");

    assert!(dissection.status.is_ok(), "{}", dissection.report);
    assert_eq!(dissection.report.matches(") Pair :").count(), 2);
    assert!(dissection.report.contains(&line("(2.2) Pair", "F1F2 = '12'")));
    assert!(dissection.report.contains(&line("(4.2) Pair", "F3F4 = '34'")));
    assert!(dissection.report.ends_with(&line("(6.1) Trailer", "C9 = 'I'")));
}

#[test]
fn test_ascii_charset() {
    let layout = Layout::from_xml_str(
        r#"<layout type="dsect"><field name="Name" length="3" type="C"/></layout>"#,
    )
    .unwrap();
    let options = DissectOptions {
        charset: Charset::Ascii,
        ..DissectOptions::default()
    };
    let dissection = Dissector::new(&layout).with_options(options).dissect("414243");
    assert_eq!(dissection.report, line("(0.3) Name", "414243 = 'ABC'"));
}

#[test]
fn test_dissector_is_reusable() {
    let layout = Layout::from_xml_str(TRANSACTION_LAYOUT).unwrap();
    let dissector = Dissector::new(&layout);

    let short = dissector.dissect("0020C2");
    assert!(matches!(
        short.status,
        Err(DissectError::ValueLengthMismatch { .. })
    ));
    assert_eq!(short.code(), -11);

    let again = dissector.dissect("0020C2");
    assert_eq!(again.report, short.report);
    assert_eq!(again.offset, short.offset);
}

#[test]
fn test_failure_keeps_partial_report() {
    let layout = Layout::from_xml_str(
        r#"<layout type="raw">
             <field name="Kind" length="1"/>
             <field name="Ver" length="1" kind="version"/>
             <version name="1"><field name="One" length="1"/></version>
           </layout>"#,
    )
    .unwrap();
    let dissection = Dissector::new(&layout).dissect("A9z");

    assert_eq!(
        dissection.status,
        Err(DissectError::VersionNotFound {
            selector: "9".to_string()
        })
    );
    let expected = [
        line("(0.1) Kind", "'A'"),
        line("(1.1) Ver", "'9'"),
        "Error: Version '9' not found.\n".to_string(),
    ]
    .concat();
    assert_eq!(dissection.report, expected);
}
