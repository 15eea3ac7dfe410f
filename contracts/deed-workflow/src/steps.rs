//! Step Instance Store: the live, ordered steps of one deed and the cursor
//! pointing at the next step awaiting completion.

use soroban_sdk::{log, Env, Vec};

use crate::types::{roles, step_flags, Error, StepDefinition, StepSequence, StepTemplate};

impl StepTemplate {
    /// Shape checks shared by every policy.
    ///
    /// A step names one or two role categories, needs at least one signature
    /// or submission in total, and only asks for a secondary count when a
    /// second category exists.
    pub fn validate(&self) -> Result<(), Error> {
        if self.is_well_formed() {
            return Ok(());
        }
        log!(
            self.selector.env(),
            "Malformed step. Roles: {}, Flags: {}, Required: {}",
            self.roles,
            self.flags,
            self.required.total()
        );
        Err(Error::InvalidStep)
    }

    fn is_well_formed(&self) -> bool {
        let categories = self.roles.count_ones();
        self.selector.to_array() != [0u8; 4]
            && self.roles != 0
            && self.roles & !roles::ALL == 0
            && categories <= 2
            && self.flags & !step_flags::ALL == 0
            && self.required.total() != 0
            && (categories == 2 || self.required.secondary == 0)
    }
}

impl StepSequence {
    pub fn new(env: &Env) -> Self {
        StepSequence {
            steps: Vec::new(env),
            cursor: 0,
            next_id: 0,
        }
    }

    /// Builds the initial flow. Ownership steps are kept out of the ordinary
    /// sequence; the finalizer owns its own dedicated step.
    pub fn from_templates(env: &Env, templates: &Vec<StepTemplate>) -> Result<Self, Error> {
        if templates.is_empty() {
            log!(env, "Flow has no steps");
            return Err(Error::InvalidStep);
        }
        let mut sequence = Self::new(env);
        for template in templates.iter() {
            if template.flags & step_flags::OWNERSHIP != 0 {
                log!(env, "Ownership step inside the ordinary flow");
                return Err(Error::InvalidStep);
            }
            let step = sequence.define(&template, false)?;
            sequence.steps.push_back(step);
        }
        Ok(sequence)
    }

    /// Allocates the next step id for `template`.
    pub fn define(&mut self, template: &StepTemplate, done: bool) -> Result<StepDefinition, Error> {
        template.validate()?;
        let id = self.next_id;
        self.next_id = id.checked_add(1).ok_or(Error::OutOfRange)?;
        Ok(StepDefinition {
            id,
            selector: template.selector.clone(),
            roles: template.roles,
            required: template.required,
            flags: template.flags,
            done,
        })
    }

    pub fn len(&self) -> u32 {
        self.steps.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.steps.len()
    }

    /// Inserts a step and returns the index it landed at.
    ///
    /// `position` is 1-based: `0` appends, `p` places the step before the one
    /// currently at index `p - 1`, and `len + 1` appends as well. A step that
    /// lands strictly behind the cursor becomes part of the completed history
    /// and the cursor moves with the step it was pointing at.
    pub fn insert(&mut self, template: &StepTemplate, position: u32) -> Result<u32, Error> {
        let len = self.steps.len();
        if position > len.saturating_add(1) {
            log!(self.steps.env(), "Insert position out of range. Position: {}, Length: {}", position, len);
            return Err(Error::OutOfRange);
        }
        if template.flags & step_flags::OWNERSHIP != 0 {
            log!(self.steps.env(), "Ownership step cannot be inserted");
            return Err(Error::InvalidStep);
        }

        let index = if position == 0 { len } else { position - 1 };
        let behind_cursor = index < self.cursor;
        let step = self.define(template, behind_cursor)?;
        self.steps.insert(index, step);
        if behind_cursor {
            self.cursor += 1;
        }
        Ok(index)
    }

    pub fn current(&self) -> Result<StepDefinition, Error> {
        self.steps.get(self.cursor).ok_or(Error::SequenceExhausted)
    }

    /// Marks the current step done and moves the cursor to the next undone step.
    pub fn advance(&mut self) -> Result<StepDefinition, Error> {
        let mut step = self.current()?;
        step.done = true;
        self.steps.set(self.cursor, step.clone());
        self.cursor += 1;
        while let Some(next) = self.steps.get(self.cursor) {
            if !next.done {
                break;
            }
            self.cursor += 1;
        }
        Ok(step)
    }
}
