use crate::{error::Error, sequence::Sequence, Result};
use bio::alphabets::dna;
use log::{debug, info, warn};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::convert::TryFrom;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// Position of a base slot on a virtual helix as `(helix number, index)`
pub type Position = (i64, i64);

const EMPTY_LINK: [i64; 4] = [-1, -1, -1, -1];

/// Virtual helix of a cadnano 2 design. Each `scaf`/`stap` entry holds the 5' and 3'
/// neighbours of a slot as `[prev_helix, prev_index, next_helix, next_index]`.
#[derive(Debug, Clone, Deserialize)]
pub struct VirtualHelix {
    pub num: i64,
    pub scaf: Vec<[i64; 4]>,
    pub stap: Vec<[i64; 4]>,
    /// Number of extra bases inserted at a slot
    #[serde(default, rename = "loop")]
    pub loops: Vec<i64>,
    /// `-1` removes the base at a slot
    #[serde(default)]
    pub skip: Vec<i64>,
}

impl VirtualHelix {
    /// Number of bases a slot contributes after applying skips and loops
    fn copies(&self, index: i64) -> usize {
        let index = match usize::try_from(index) {
            Ok(index) => index,
            Err(_) => return 0,
        };
        if self.skip.get(index).copied().unwrap_or(0) == -1 {
            0
        } else {
            1 + self.loops.get(index).copied().unwrap_or(0).max(0) as usize
        }
    }
}

/// Raw cadnano 2 JSON design
#[derive(Debug, Clone, Deserialize)]
pub struct CadnanoDesign {
    #[serde(default)]
    pub name: Option<String>,
    pub vstrands: Vec<VirtualHelix>,
}

impl CadnanoDesign {
    pub fn from_reader<R: Read>(rdr: R) -> Result<Self> {
        Ok(serde_json::from_reader(rdr)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::MissingInput(path.to_path_buf()));
        }
        debug!("Reading cadnano design {}", path.display());
        Self::from_reader(BufReader::new(File::open(path)?))
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum StrandKind {
    Scaffold,
    Staple,
}

/// Single base on a strand
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Base {
    pub helix: i64,
    pub index: i64,
    pub seq: u8,
}

/// Strand with its bases in 5' to 3' order
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Strand {
    pub kind: StrandKind,
    pub tour: Vec<Base>,
    pub is_circular: bool,
}

impl Strand {
    /// Joins the bases of the tour into a contiguous 5' to 3' sequence
    pub fn sequence(&self) -> String {
        self.tour.iter().map(|base| base.seq as char).collect()
    }

    /// `helix[index]` of the 5' end
    pub fn desc(&self) -> String {
        match self.tour.first() {
            Some(base) => format!("{}[{}]", base.helix, base.index),
            None => String::from("empty"),
        }
    }
}

/// Strands of a design with sequences applied
#[derive(Debug, Clone, Default)]
pub struct Design {
    strands: Vec<Strand>,
}

impl Design {
    pub fn new(strands: Vec<Strand>) -> Self {
        Self { strands }
    }

    /// Traces scaffold and staple strands of the cadnano design, lays the scaffold sequence
    /// along the scaffold and derives the staple sequences from their scaffold partners.
    pub fn from_cadnano(design: &CadnanoDesign, scaffold_seq: &[u8]) -> Result<Self> {
        let tracer = Tracer::new(design);

        let mut scaffolds = tracer.trace(StrandKind::Scaffold)?;
        if scaffolds.len() != 1 {
            return Err(Error::ScaffoldCardinality(scaffolds.len()));
        }
        let (scaffold_tour, scaffold_circular) = scaffolds.remove(0);

        let needed = scaffold_tour
            .iter()
            .map(|pos| tracer.copies(*pos))
            .sum::<usize>();
        if scaffold_seq.len() < needed {
            return Err(Error::ScaffoldSequenceTooShort {
                needed,
                available: scaffold_seq.len(),
            });
        } else if scaffold_seq.len() > needed {
            warn!(
                "Scaffold sequence has {} bases but only the first {} are used",
                scaffold_seq.len(),
                needed
            );
        }

        let mut paired = HashMap::<Position, Vec<u8>>::new();
        let mut seq = scaffold_seq.iter().map(u8::to_ascii_uppercase);
        let mut scaffold = Vec::with_capacity(needed);
        for pos in scaffold_tour {
            let bases = seq.by_ref().take(tracer.copies(pos)).collect::<Vec<u8>>();
            scaffold.extend(bases.iter().map(|nuc| Base {
                helix: pos.0,
                index: pos.1,
                seq: *nuc,
            }));
            paired.insert(pos, bases);
        }

        let mut strands = vec![Strand {
            kind: StrandKind::Scaffold,
            tour: scaffold,
            is_circular: scaffold_circular,
        }];

        for (tour, is_circular) in tracer.trace(StrandKind::Staple)? {
            let mut staple = Vec::new();
            for pos in tour {
                let copies = tracer.copies(pos);
                // antiparallel, so inserted bases pair in reverse order
                let bases = match paired.get(&pos) {
                    Some(partner) if partner.len() == copies => {
                        partner.iter().rev().map(|nuc| dna::complement(*nuc)).collect()
                    }
                    _ => vec![b'N'; copies],
                };
                staple.extend(bases.into_iter().map(|nuc| Base {
                    helix: pos.0,
                    index: pos.1,
                    seq: nuc,
                }));
            }
            if staple.is_empty() {
                debug!("Ignoring staple without any bases after applying skips");
                continue;
            }
            strands.push(Strand {
                kind: StrandKind::Staple,
                tour: staple,
                is_circular,
            });
        }

        Ok(Self { strands })
    }

    pub fn strands(&self) -> &[Strand] {
        &self.strands
    }

    /// Returns the single scaffold strand or a [`Error::ScaffoldCardinality`] if there is none or
    /// several of them
    pub fn scaffold(&self) -> Result<&Strand> {
        let mut scaffolds = self
            .strands
            .iter()
            .filter(|strand| strand.kind == StrandKind::Scaffold);
        match (scaffolds.next(), scaffolds.count()) {
            (Some(scaffold), 0) => Ok(scaffold),
            (None, _) => Err(Error::ScaffoldCardinality(0)),
            (Some(_), others) => Err(Error::ScaffoldCardinality(others + 1)),
        }
    }

    pub fn staples(&self) -> impl Iterator<Item = &Strand> {
        self.strands
            .iter()
            .filter(|strand| strand.kind == StrandKind::Staple)
    }
}

/// Follows the 3' links of the cadnano slot arrays
struct Tracer<'a> {
    helices: HashMap<i64, &'a VirtualHelix>,
}

impl<'a> Tracer<'a> {
    fn new(design: &'a CadnanoDesign) -> Self {
        Self {
            helices: design.vstrands.iter().map(|vh| (vh.num, vh)).collect(),
        }
    }

    fn copies(&self, pos: Position) -> usize {
        self.helices
            .get(&pos.0)
            .map_or(0, |helix| helix.copies(pos.1))
    }

    fn link(&self, kind: StrandKind, pos: Position) -> Result<Option<[i64; 4]>> {
        let helix = self
            .helices
            .get(&pos.0)
            .ok_or_else(|| Error::UnknownHelix(pos.0))?;
        let slots = match kind {
            StrandKind::Scaffold => &helix.scaf,
            StrandKind::Staple => &helix.stap,
        };
        Ok(usize::try_from(pos.1)
            .ok()
            .and_then(|index| slots.get(index))
            .copied()
            .filter(|link| *link != EMPTY_LINK))
    }

    /// Returns every strand of the given kind as slot positions plus whether it is circular.
    /// Linear strands come first, ordered by their 5' end, followed by circular ones.
    fn trace(&self, kind: StrandKind) -> Result<Vec<(Vec<Position>, bool)>> {
        let mut occupied = Vec::new();
        let mut starts = Vec::new();
        for helix in self.helices.values() {
            let slots = match kind {
                StrandKind::Scaffold => &helix.scaf,
                StrandKind::Staple => &helix.stap,
            };
            for (index, link) in slots.iter().enumerate() {
                if *link == EMPTY_LINK {
                    continue;
                }
                let pos = (helix.num, index as i64);
                occupied.push(pos);
                if link[0] < 0 {
                    starts.push(pos);
                }
            }
        }
        occupied.sort_unstable();
        starts.sort_unstable();

        let mut visited = HashSet::new();
        let mut strands = Vec::new();
        for start in starts {
            strands.push(self.walk(kind, start, &mut visited)?);
        }
        for pos in occupied {
            if !visited.contains(&pos) {
                strands.push(self.walk(kind, pos, &mut visited)?);
            }
        }

        info!("Traced {} {:?} strands", strands.len(), kind);
        Ok(strands)
    }

    fn walk(
        &self,
        kind: StrandKind,
        start: Position,
        visited: &mut HashSet<Position>,
    ) -> Result<(Vec<Position>, bool)> {
        let mut tour = Vec::new();
        let mut pos = start;
        loop {
            let broken = Error::BrokenStrand {
                helix: pos.0,
                index: pos.1,
            };
            if !visited.insert(pos) {
                return Err(broken);
            }
            let link = self.link(kind, pos)?.ok_or(broken)?;
            tour.push(pos);

            let next = (link[2], link[3]);
            if next.0 < 0 {
                return Ok((tour, false));
            } else if next == start {
                return Ok((tour, true));
            }
            pos = next;
        }
    }
}

/// Reads the scaffold sequence from a plain text file (whitespace is ignored) or from the first
/// record of a FASTA file. Both can be gzip compressed.
pub fn read_scaffold_sequence<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::MissingInput(path.to_path_buf()));
    }
    let (mut rdr, _) = niffler::from_path(path)?;
    let mut content = Vec::new();
    rdr.read_to_end(&mut content)?;

    if content.first() == Some(&b'>') {
        let fasta_rdr = bio::io::fasta::Reader::new(&content[..]);
        match fasta_rdr.records().next() {
            Some(record) => Ok(record?.seq().to_vec()),
            None => Ok(Vec::new()),
        }
    } else {
        Ok(content
            .into_iter()
            .filter(|nuc| !nuc.is_ascii_whitespace())
            .collect())
    }
}

/// Design together with the files it was loaded from
#[derive(Debug)]
pub struct Project {
    pub design_file: PathBuf,
    pub sequence_file: PathBuf,
    design: Design,
}

impl Project {
    /// Reads the cadnano design and applies the scaffold sequence to it
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(design_file: P, sequence_file: Q) -> Result<Self> {
        let design_file = design_file.as_ref().to_path_buf();
        let sequence_file = sequence_file.as_ref().to_path_buf();
        for path in [&design_file, &sequence_file].iter() {
            if !path.exists() {
                return Err(Error::MissingInput(path.to_path_buf()));
            }
        }

        let cadnano = CadnanoDesign::from_path(&design_file)?;
        let scaffold_seq = read_scaffold_sequence(&sequence_file)?;
        let design = Design::from_cadnano(&cadnano, &scaffold_seq)?;
        info!(
            "Loaded design {} with {} strands",
            cadnano.name.as_deref().unwrap_or("unnamed"),
            design.strands().len()
        );

        Ok(Self {
            design_file,
            sequence_file,
            design,
        })
    }

    pub fn design(&self) -> &Design {
        &self.design
    }

    pub fn scaffold(&self) -> Result<Sequence> {
        let scaffold = self.design.scaffold()?;
        debug!(
            "Scaffold starts at {} and has {} bases",
            scaffold.desc(),
            scaffold.tour.len()
        );
        Sequence::new("scaffold", scaffold.sequence())
    }

    pub fn staples(&self) -> Result<Vec<Sequence>> {
        self.design
            .staples()
            .enumerate()
            .map(|(i, staple)| {
                Sequence::new(format!("staple_{} {}", i, staple.desc()), staple.sequence())
            })
            .collect()
    }
}
