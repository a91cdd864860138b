#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use libretto_manifest::{LinkSection, ManifestDocument};

#[derive(Debug, Arbitrary)]
enum Edit {
    Add { dev: bool, name: String, constraint: String, sort: bool },
    Remove { dev: bool, name: String },
}

#[derive(Debug, Arbitrary)]
struct Input {
    text: String,
    edits: Vec<Edit>,
}

fuzz_target!(|input: Input| {
    let Ok(mut document) = ManifestDocument::parse(&input.text) else {
        return;
    };

    for edit in input.edits {
        match edit {
            Edit::Add { dev, name, constraint, sort } => {
                document.add_link(LinkSection::from_dev(dev), &name, &constraint, sort);
            }
            Edit::Remove { dev, name } => {
                let _ = document.remove_link(LinkSection::from_dev(dev), &name);
            }
        }
    }

    // Whatever the edits, the rendered document must parse back with the same links.
    let Ok(rendered) = document.render() else {
        return;
    };
    let reparsed = ManifestDocument::parse(&rendered).expect("rendered manifest must parse");
    for section in [LinkSection::Require, LinkSection::RequireDev] {
        assert_eq!(reparsed.links(section), document.links(section));
    }
});
