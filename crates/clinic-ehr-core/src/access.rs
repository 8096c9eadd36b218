//! Role-based access rules.
//!
//! Each staff role gets a fixed read/write grant per resource. Admins can do
//! everything. Clinic settings are readable by every role since every page
//! needs the clinic name, offset and hours.
//!
//! | role           | read                                               | write                                   |
//! |----------------|----------------------------------------------------|-----------------------------------------|
//! | doctor         | clinical, pharmacy, reports, calendar              | patients, appointments, records, labs, prescriptions |
//! | nurse          | clinical, pharmacy                                 | patients, appointments, records         |
//! | receptionist   | patients, appointments, payments, calendar         | patients, appointments, payments, calendar |
//! | pharmacist     | patients, prescriptions, pharmacy                  | prescriptions, pharmacy                 |
//! | lab_technician | patients, lab tests                                | lab tests                               |
//! | accountant     | patients, payments, reports                        | payments                                |

text_enum! {
    /// Staff role.
    pub enum Role {
        Admin => "admin",
        Doctor => "doctor",
        Nurse => "nurse",
        Receptionist => "receptionist",
        Pharmacist => "pharmacist",
        LabTechnician => "lab_technician",
        Accountant => "accountant",
    }
}

text_enum! {
    /// Something a request touches.
    pub enum Resource {
        Patients => "patients",
        Appointments => "appointments",
        MedicalRecords => "medical_records",
        LabTests => "lab_tests",
        Prescriptions => "prescriptions",
        Pharmacy => "pharmacy",
        Payments => "payments",
        Reports => "reports",
        Settings => "settings",
        Backups => "backups",
        Deployments => "deployments",
        Calendar => "calendar",
        Users => "users",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Write,
}

impl Role {
    /// Whether this role may perform `action` on `resource`.
    pub fn can(&self, action: Action, resource: Resource) -> bool {
        let (read, write) = self.grant(resource);
        match action {
            Action::Read => read,
            Action::Write => write,
        }
    }

    /// (read, write) grant for a resource.
    fn grant(&self, resource: Resource) -> (bool, bool) {
        use Resource::*;

        const NONE: (bool, bool) = (false, false);
        const READ: (bool, bool) = (true, false);
        const FULL: (bool, bool) = (true, true);

        if *self == Role::Admin {
            return FULL;
        }
        if resource == Settings {
            return READ;
        }

        match (self, resource) {
            (Role::Doctor, Patients | Appointments | MedicalRecords | LabTests | Prescriptions) => {
                FULL
            }
            (Role::Doctor, Pharmacy | Reports | Calendar) => READ,

            (Role::Nurse, Patients | Appointments | MedicalRecords) => FULL,
            (Role::Nurse, LabTests | Prescriptions | Pharmacy) => READ,

            (Role::Receptionist, Patients | Appointments | Payments | Calendar) => FULL,

            (Role::Pharmacist, Prescriptions | Pharmacy) => FULL,
            (Role::Pharmacist, Patients) => READ,

            (Role::LabTechnician, LabTests) => FULL,
            (Role::LabTechnician, Patients) => READ,

            (Role::Accountant, Payments) => FULL,
            (Role::Accountant, Patients | Reports) => READ,

            _ => NONE,
        }
    }
}
