//! Theoretical background.
//!
//! # Contents
//! - [Background](#background)
//! - [Units](#units)
//! - [Boundary value problems](#boundary-value-problems)
//! - [Shooting and the well depth](#shooting-and-the-well-depth)
//!
//! # Background
//! The deuteron is the only bound state of the two-nucleon system, with a
//! binding energy of about 2.224 MeV and total angular momentum and parity
//! *J*<sup>*π*</sup> = 1<sup>+</sup>. To a good first approximation it is an
//! *S*-wave (*l* = 0) state of a neutron and proton interacting through a
//! short-range, attractive, spherically symmetric potential. Here we take the
//! simplest such potential, a square well
//! ```text
//! V(r) = -V₀  for r ≤ R
//!         0   for r > R
//! ```
//! For a radially symmetric potential the wavefunction separates as
//! *ψ*(*r*, *θ*, *φ*) = *R*(*r*) *Y*(*θ*, *φ*), and in terms of the reduced
//! radial wavefunction *P*(*r*) ≡ *r* *R*(*r*) the *S*-wave radial Schrödinger
//! equation takes the one-dimensional form
//! ```text
//!    ħ²  d²P
//! - ---- --- + V(r) P(r) = E P(r)
//!   2 m  dr²
//! ```
//! with the boundary condition *P*(0) = 0 (regularity of *R* at the origin)
//! and *P*(*r*) → 0 as *r* → ∞ (normalizability). Numerically, both
//! conditions are imposed at finite radii *r*<sub>min</sub> and
//! *r*<sub>max</sub>.
//!
//! The radial equation is written here as
//! ```text
//! d²P          2
//! --- = --------- (V(r) - E) P(r)
//! dr²   (ħ²/2m)
//! ```
//! This differs from the equation above by a factor of 2: it is the radial
//! equation for a kinetic-energy scale of (*ħ*²/2*m*)/2, i.e. for a particle of
//! twice the nucleon mass. The factor is kept on purpose, so that the numbers
//! produced here reproduce the reference model this crate implements; the
//! wavenumbers *k* and *κ* and the bound-state condition below all follow the
//! same convention. With *y* = \[*P*, *P*'\] the equation becomes the
//! first-order system
//! ```text
//! dy₀/dr = y₁
//! dy₁/dr = q(r) y₀,   q(r) = 2 (V(r) - E) / (ħ²/2m)
//! ```
//! In the well, *q* < 0 and *P* oscillates with wavenumber *k* = √(−*q*);
//! outside, *q* > 0 and *P* is a combination of growing and decaying
//! exponentials with decay constant *κ* = √*q*. Matching the logarithmic
//! derivatives of the interior solution sin(*k* (*r* − *r*<sub>min</sub>))
//! and the exterior solution sinh(*κ* (*r*<sub>max</sub> − *r*)) at *r* = *R*
//! gives the bound-state condition
//! ```text
//! k cot(k (R - r_min)) = -κ coth(κ (r_max - R))
//! ```
//! which reduces to the textbook *k* cot(*k R*) = −*κ* as *r*<sub>min</sub> → 0
//! and *r*<sub>max</sub> → ∞.
//!
//! # Units
//! All quantities are expressed in the nuclear unit system, with energies in
//! MeV and lengths in fm. The kinetic-energy scale *ħ*²/2*m* then has units of
//! MeV fm², and with *ħc* = 197.327 MeV fm and *m* the average nucleon mass,
//! ```text
//!  ħ²     (ħ c)²
//! ---- = -------- ≈ 20.735 MeV fm²
//! 2 m    2 m c²
//! ```
//! Items in [`units`][crate::units] provide these constants and conversions.
//!
//! # Boundary value problems
//! A general two-point BVP in first-order form, possibly with unknown
//! parameters *p*, reads
//! ```text
//! dy/dx = f(x, y, p),   a ≤ x ≤ b
//! bc(y(a), y(b), p) = 0
//! ```
//! where *y* has *n* components, *p* has *k* components, and *bc* has *n* + *k*
//! components. It is solved by collocation[^1]: the solution is sought as a
//! continuous piecewise cubic *S*(*x*) over a mesh *x*₀ < *x*₁ < ... <
//! *x*<sub>*m*−1</sub> that satisfies the ODE at the mesh nodes and at the
//! midpoint of each interval. This is equivalent to the fourth-order Lobatto
//! IIIA implicit Runge-Kutta scheme. On each interval of width *h*, with
//! *f*<sub>*l*</sub> and *f*<sub>*r*</sub> evaluated at the interval ends, the
//! cubic's value at the midpoint is
//! ```text
//! y_mid = (y_l + y_r) / 2 - h (f_r - f_l) / 8
//! ```
//! and the collocation residual is the mismatch between the step in *y* and
//! its Simpson's-rule integral,
//! ```text
//! Φ = y_r - y_l - h (f_l + 4 f(x_mid, y_mid, p) + f_r) / 6
//! ```
//! Stacking Φ over all intervals with the boundary residuals gives a nonlinear
//! system of *n* *m* + *k* equations in the *n* *m* + *k* unknowns, which is
//! solved by a damped Newton method. The Jacobian has a sparse block
//! structure, with one *n*×*n* block per interval endpoint plus dense columns
//! for the parameters and dense rows for the boundary conditions; it is only
//! recomputed when a full Newton step fails to decrease the (Jacobian-weighted)
//! residual sufficiently, with step lengths halved up to four times per
//! iteration.
//!
//! Once the collocation system is solved, the accuracy of the continuous
//! solution is checked by its residual *r*(*x*) = *S*'(*x*) −
//! *f*(*x*, *S*(*x*), *p*), scaled elementwise by 1 + |*f*|. The RMS of this
//! quantity over each interval is estimated with five-point Lobatto
//! quadrature, whose endpoint terms vanish by construction. Intervals with
//! residual above the tolerance get one new node at their midpoint (or two
//! nodes, splitting them into thirds, if the residual exceeds 100 times the
//! tolerance), and the procedure repeats on the refined mesh with the
//! interpolated cubic as the new guess.
//!
//! Note that the radial equation with fixed *V*₀ and *E* is linear and
//! homogeneous in *P*. Unless *V*₀ is exactly an eigenvalue, the only solution
//! satisfying *P*(*r*<sub>min</sub>) = *P*(*r*<sub>max</sub>) = 0 is *P* ≡ 0,
//! and a solver started from the zero guess returns it immediately. Promoting
//! *V*₀ to an unknown parameter and adding a normalization condition
//! *P*'(*r*<sub>min</sub>) = *s* turns the problem into a well-posed nonlinear
//! eigenvalue problem, solved by [`radial::solve_depth`][crate::radial::solve_depth].
//!
//! # Shooting and the well depth
//! The alternative is a shooting method: integrate the radial equation as an
//! initial value problem from *P*(*r*<sub>min</sub>) = 0,
//! *P*'(*r*<sub>min</sub>) = 1 with the classical fourth-order Runge-Kutta
//! method and adjust *V*₀ until *P*(*r*<sub>max</sub>) = 0. By Sturm
//! oscillation theory, for fixed *E* the number of nodes *ν* of the shot
//! increases by one each time *V*₀ passes an eigenvalue, so the node count
//! identifies a particular state. Because *V* jumps at *R*, the Runge-Kutta
//! step containing the well edge is split there; a step straddling the jump
//! would otherwise reduce the whole integration to first order. The search in
//! [`shoot`][crate::shoot] first bisects the depth bounds until the shots at
//! either end have *ν* and *ν* + 1 nodes, within which *P*(*r*<sub>max</sub>)
//! changes sign exactly once, and then converges on the sign change with the
//! Illinois variant of [regula falsi][regula-falsi]. The resulting shot is a
//! good initial guess for the collocation solver.
//!
//! [^1]: J. Kierzenka and L. F. Shampine, "A BVP Solver Based on Residual
//! Control and the Matlab PSE." ACM Trans. Math. Softw. **27** 3 299-316
//! (2001).
//!
//! [regula-falsi]: https://en.wikipedia.org/wiki/Regula_falsi
