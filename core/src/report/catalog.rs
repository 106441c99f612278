//! Numbered calibration windows and the file names derived from them.

use crate::clock::DateConverter;
use crate::intervals::TimeSpan;
use crate::prelude::CalResult;
use serde::Serialize;

/// Window used for any number outside the catalog.
const CUSTOM_WINDOW: (&str, &str, &str) = ("i00", "2012:338:00:00:00.000", "2012:339:00:00:00.000");

const CATALOG: [(u32, &str, &str, &str); 31] = [
    (1, "i01", "2003:274:14:00:00.000", "2004:093:00:00:00.000"),
    (2, "i02", "2004:093:00:00:00.000", "2004:276:00:00:00.000"),
    (3, "i03", "2004:276:00:00:00.000", "2005:092:00:00:00.000"),
    (4, "i04", "2005:092:00:00:00.000", "2005:275:00:00:00.000"),
    (5, "i05", "2005:275:00:00:00.000", "2006:090:00:00:00.000"),
    (6, "i06", "2006:090:00:00:00.000", "2006:271:00:00:00.000"),
    (7, "i07", "2006:271:00:00:00.000", "2006:352:00:00:00.000"),
    (8, "i08", "2006:352:16:00:00.000", "2007:148:00:00:00.000"),
    (9, "i09", "2007:148:00:00:00.000", "2007:306:00:00:00.000"),
    (10, "i10", "2007:306:00:00:00.000", "2008:060:00:00:00.000"),
    (11, "i11", "2008:060:00:00:00.000", "2008:186:00:00:00.000"),
    (12, "i12", "2008:186:00:00:00.000", "2008:319:00:00:00.000"),
    (13, "i13", "2008:319:00:00:00.000", "2009:052:00:00:00.000"),
    (14, "i14", "2009:052:00:00:00.000", "2009:156:00:00:00.000"),
    (15, "i15", "2009:156:00:00:00.000", "2009:275:00:00:00.000"),
    (16, "i16", "2009:275:00:00:00.000", "2010:001:00:00:00.000"),
    (17, "i17", "2010:001:00:00:00.000", "2010:106:00:00:00.000"),
    (18, "i18", "2010:106:00:00:00.000", "2010:204:00:00:00.000"),
    (19, "i19", "2010:204:00:00:00.000", "2010:302:00:00:00.000"),
    (20, "i20", "2010:302:00:00:00.000", "2010:350:20:00:00.000"),
    (21, "i21", "2010:351:00:00:00.000", "2011:105:21:20:00.000"),
    // ends before safe mode 4
    (22, "i22", "2011:105:21:20:00.000", "2011:187:08:00:00.000"),
    (23, "i23", "2011:192:03:00:00.000", "2011:257:00:00:00.000"),
    (24, "i24", "2011:257:00:00:00.000", "2011:319:00:00:00.000"),
    (25, "i25", "2011:319:00:00:00.000", "2012:022:00:00:00.000"),
    // ends before the fifth M matrix uplink
    (26, "i26", "2012:022:00:00:00.000", "2012:062:15:00:00.000"),
    (27, "i27", "2012:062:16:00:00.000", "2012:150:03:33:00.000"),
    (28, "i28", "2012:152:00:00:00.000", "2012:215:00:00:00.000"),
    (29, "i29c", "2012:336:00:00:00.000", "2013:021:00:00:00.000"),
    (30, "i30a", "2012:062:16:00:00.000", "2012:364:00:00:00.000"),
    (99, "i99", "2003:207:00:00:00.000", "2099:365:23:59:59.999"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingWindow {
    pub label: String,
    pub start: String,
    pub stop: String,
}

impl ProcessingWindow {
    /// Catalog window `number`; unknown numbers give the custom window.
    pub fn catalog(number: u32) -> Self {
        let (label, start, stop) = CATALOG
            .iter()
            .find(|(n, ..)| *n == number)
            .map(|&(_, label, start, stop)| (label, start, stop))
            .unwrap_or(CUSTOM_WINDOW);
        Self {
            label: label.to_string(),
            start: start.to_string(),
            stop: stop.to_string(),
        }
    }

    /// Explicit dates, labelled as the custom window.
    pub fn custom(start: impl Into<String>, stop: impl Into<String>) -> Self {
        Self {
            label: CUSTOM_WINDOW.0.to_string(),
            start: start.into(),
            stop: stop.into(),
        }
    }

    pub fn span(&self, clock: &impl DateConverter) -> CalResult<TimeSpan> {
        Ok(TimeSpan::new(clock.to_secs(&self.start)?, clock.to_secs(&self.stop)?))
    }

    pub fn table_file(&self, version: &str) -> String {
        format!("getirudata_{}_{}.out", self.label, version)
    }

    pub fn summary_file(&self, version: &str) -> String {
        format!("getirudata_{}_{}.sum", self.label, version)
    }
}
