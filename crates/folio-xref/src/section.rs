use std::ops::Range;

/// A run of consecutive object numbers written as one subsection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Subsection {
    pub first: u32,
    pub count: u32,
}

impl Subsection {
    pub fn numbers(&self) -> Range<u32> {
        self.first..self.first.saturating_add(self.count)
    }
}

/// Group strictly ascending object numbers into maximal consecutive runs.
pub fn subsections<I>(numbers: I) -> Vec<Subsection>
where
    I: IntoIterator<Item = u32>,
{
    let mut runs: Vec<Subsection> = Vec::new();
    for number in numbers {
        match runs.last_mut() {
            Some(run) if u64::from(run.first) + u64::from(run.count) == u64::from(number) => {
                run.count += 1;
            }
            _ => runs.push(Subsection {
                first: number,
                count: 1,
            }),
        }
    }
    runs
}
